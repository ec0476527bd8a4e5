use crate::{
    detector::{BoundingBox, Detection, Detector},
    model_loader::ModelSlot,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::instrument;

pub const NO_DETECTION_LABEL: &str = "No sign detected";

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Invalid image: {0}")]
    Decode(String),
    #[error("Invalid request: {0}")]
    Request(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Inference failed: timed out after {0} ms")]
    Timeout(u64),
}

/// Response body of `POST /predict`. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Detected {
        label: String,
        confidence: f32,
        bbox: BoundingBox,
    },
    NoDetection {
        label: &'static str,
        confidence: u8,
    },
    Error {
        error: String,
    },
}

impl PredictionResult {
    pub fn no_detection() -> Self {
        PredictionResult::NoDetection {
            label: NO_DETECTION_LABEL,
            confidence: 0,
        }
    }
}

impl From<Detection> for PredictionResult {
    fn from(detection: Detection) -> Self {
        PredictionResult::Detected {
            label: detection.label,
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}

impl From<PredictionError> for PredictionResult {
    fn from(err: PredictionError) -> Self {
        PredictionResult::Error {
            error: err.to_string(),
        }
    }
}

/// Keeps detections at or above `confidence_floor` and returns the one with
/// the strictly highest confidence. On ties the earliest one wins.
pub fn select_best(detections: Vec<Detection>, confidence_floor: f32) -> Option<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= confidence_floor)
        .fold(None, |best: Option<Detection>, candidate| match best {
            Some(current) if candidate.confidence <= current.confidence => Some(current),
            _ => Some(candidate),
        })
}

pub struct PredictionService<D: Detector> {
    model: Arc<ModelSlot<D>>,
    timeout: Duration,
}

impl<D: Detector> Clone for PredictionService<D> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            timeout: self.timeout,
        }
    }
}

impl<D: Detector> PredictionService<D> {
    pub fn new(model: Arc<ModelSlot<D>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    #[instrument(skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    pub async fn predict(&self, image_bytes: Vec<u8>) -> PredictionResult {
        match self.try_predict(image_bytes).await {
            Ok(Some(detection)) => {
                tracing::debug!(
                    "Best detection: label={}, confidence={:.3}",
                    detection.label,
                    detection.confidence
                );
                detection.into()
            }
            Ok(None) => PredictionResult::no_detection(),
            Err(err) => {
                tracing::warn!("Prediction failed: {}", err);
                err.into()
            }
        }
    }

    async fn try_predict(
        &self,
        image_bytes: Vec<u8>,
    ) -> Result<Option<Detection>, PredictionError> {
        let handle = self.model.get().ok_or(PredictionError::ModelNotLoaded)?.clone();

        let image = decode_image(&image_bytes)?;
        let params = handle.params;
        let detector = handle.detector;

        let task = tokio::task::spawn_blocking(move || detector.detect(&image, &params));
        let detections = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| PredictionError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| PredictionError::Inference(e.to_string()))?
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        tracing::debug!("Detector returned {} detections", detections.len());
        Ok(select_best(detections, params.confidence_floor))
    }
}

fn decode_image(image_bytes: &[u8]) -> Result<image::DynamicImage, PredictionError> {
    image::ImageReader::new(std::io::Cursor::new(image_bytes))
        .with_guessed_format()
        .map_err(|e| PredictionError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| PredictionError::Decode(e.to_string()))
}
