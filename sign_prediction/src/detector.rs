use crate::config::InferenceConfig;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    fn area(&self) -> f32 {
        (self.xmax - self.xmin).max(0.) * (self.ymax - self.ymin).max(0.)
    }

    fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let h = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        w.max(0.) * h.max(0.)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0. {
            0.
        } else {
            inter / union
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Thresholds handed to the detector on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub confidence_floor: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for InferenceParams {
    fn default() -> Self {
        InferenceConfig::default().params()
    }
}

impl InferenceConfig {
    pub fn params(&self) -> InferenceParams {
        InferenceParams {
            confidence_floor: self.confidence_floor,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::Error),
    #[error("unexpected model output: {0}")]
    Output(String),
    #[error("session mutex poisoned")]
    Poisoned,
}

/// Opaque object-detection capability. Result order is whatever the
/// backend produces.
pub trait Detector: Send + Sync + 'static {
    fn detect(
        &self,
        image: &DynamicImage,
        params: &InferenceParams,
    ) -> Result<Vec<Detection>, DetectorError>;
}
