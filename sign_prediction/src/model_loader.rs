use crate::{
    config::{InferenceConfig, ModelConfig, SourceKind},
    detector::{Detector, InferenceParams},
    labels::load_labels,
    ort_service::OrtDetector,
};
use artifact_store::{ArtifactStore, StorageError};
use sign_common::artifact;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("model source misconfigured: {0}")]
    Source(String),
    #[error("failed to fetch model artifact: {0}")]
    Storage(#[from] StorageError),
    #[error("model artifact at {0} is missing or empty")]
    InvalidArtifact(PathBuf),
    #[error("failed to build detector: {0}")]
    Detector(String),
    #[error("model already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Local {
        path: PathBuf,
    },
    /// Materialized to `local_path` before the detector is built.
    Remote {
        bucket: String,
        key: String,
        local_path: PathBuf,
    },
}

impl ModelSource {
    pub fn from_config(model: &ModelConfig) -> Result<Self, LoadError> {
        match model.source {
            SourceKind::Local => Ok(ModelSource::Local {
                path: model.get_path(),
            }),
            SourceKind::Remote => {
                let bucket = model
                    .bucket
                    .clone()
                    .ok_or_else(|| LoadError::Source("remote source requires `bucket`".into()))?;
                let key = model
                    .key
                    .clone()
                    .ok_or_else(|| LoadError::Source("remote source requires `key`".into()))?;
                Ok(ModelSource::Remote {
                    bucket,
                    key,
                    local_path: model.get_path(),
                })
            }
        }
    }

    pub fn local_path(&self) -> &Path {
        match self {
            ModelSource::Local { path } => path,
            ModelSource::Remote { local_path, .. } => local_path,
        }
    }
}

/// A loaded detector together with the thresholds it serves with.
pub struct ModelHandle<D: Detector> {
    pub detector: Arc<D>,
    pub params: InferenceParams,
}

impl<D: Detector> Clone for ModelHandle<D> {
    fn clone(&self) -> Self {
        Self {
            detector: self.detector.clone(),
            params: self.params,
        }
    }
}

/// One-shot holder for the process model. Written once at startup,
/// read by every request afterwards.
pub struct ModelSlot<D: Detector> {
    cell: OnceLock<Option<ModelHandle<D>>>,
}

impl<D: Detector> Default for ModelSlot<D> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<D: Detector> ModelSlot<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(handle: ModelHandle<D>) -> Self {
        let slot = Self::new();
        let _ = slot.cell.set(Some(handle));
        slot
    }

    pub fn absent() -> Self {
        let slot = Self::new();
        let _ = slot.cell.set(None);
        slot
    }

    /// Records the startup outcome. Fails if an outcome was already recorded.
    pub fn initialize(&self, outcome: Option<ModelHandle<D>>) -> Result<(), LoadError> {
        self.cell
            .set(outcome)
            .map_err(|_| LoadError::AlreadyInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Option<&ModelHandle<D>> {
        self.cell.get().and_then(|outcome| outcome.as_ref())
    }
}

/// Builds a detector from a validated artifact on disk. Runs on the
/// blocking pool, so it may do slow synchronous work.
pub trait DetectorFactory: Send + Sync + 'static {
    type Output: Detector;

    fn build(&self, model_path: &Path) -> Result<Self::Output, LoadError>;
}

pub struct OrtDetectorFactory {
    model_config: ModelConfig,
    input_size: u32,
}

impl OrtDetectorFactory {
    pub fn new(model_config: &ModelConfig, inference_config: &InferenceConfig) -> Self {
        Self {
            model_config: model_config.clone(),
            input_size: inference_config.input_size,
        }
    }
}

impl DetectorFactory for OrtDetectorFactory {
    type Output = OrtDetector;

    fn build(&self, model_path: &Path) -> Result<OrtDetector, LoadError> {
        let labels = load_labels(&self.model_config.labels_file).map_err(|e| {
            LoadError::Detector(format!(
                "failed to load labels from {}: {}",
                self.model_config.labels_file.display(),
                e
            ))
        })?;

        OrtDetector::new(model_path, &self.model_config, labels, self.input_size)
            .map_err(|e| LoadError::Detector(e.to_string()))
    }
}

pub struct ModelLoader<F: DetectorFactory> {
    store: Option<Arc<dyn ArtifactStore>>,
    factory: Arc<F>,
    params: InferenceParams,
}

impl<F: DetectorFactory> ModelLoader<F> {
    pub fn new(store: Option<Arc<dyn ArtifactStore>>, factory: F, params: InferenceParams) -> Self {
        Self {
            store,
            factory: Arc::new(factory),
            params,
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, source: &ModelSource) -> Result<ModelHandle<F::Output>, LoadError> {
        if let ModelSource::Remote {
            bucket,
            key,
            local_path,
        } = source
        {
            let store = self
                .store
                .as_ref()
                .ok_or_else(|| LoadError::Source("remote source without a storage client".into()))?;
            tracing::info!("Starting model load from s3://{}/{}", bucket, key);
            store.download(bucket, key, local_path).await?;
        }

        let path = source.local_path();
        if !artifact::validate(path) {
            return Err(LoadError::InvalidArtifact(path.to_path_buf()));
        }

        let factory = self.factory.clone();
        let model_path = path.to_path_buf();
        let detector = tokio::task::spawn_blocking(move || factory.build(&model_path))
            .await
            .map_err(|e| LoadError::Detector(e.to_string()))??;
        tracing::info!(
            confidence_floor = self.params.confidence_floor,
            iou_threshold = self.params.iou_threshold,
            max_detections = self.params.max_detections,
            "Model loaded from {}",
            path.display()
        );

        Ok(ModelHandle {
            detector: Arc::new(detector),
            params: self.params,
        })
    }

    /// Loads once and records the outcome in `slot`. A failed load leaves
    /// the slot absent so the service can still answer requests.
    pub async fn initialize(
        &self,
        slot: &ModelSlot<F::Output>,
        source: &ModelSource,
    ) -> Result<(), LoadError> {
        let outcome = match self.load(source).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Model loading failed: {}", e);
                None
            }
        };
        slot.initialize(outcome)
    }
}
