use crate::config::ModelPusherConfig;
use artifact_store::{ArtifactStore, StorageError};
use sign_common::artifact;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("model artifact at {0} is missing or empty, refusing to push")]
    InvalidArtifact(PathBuf),
    #[error("model push failed: {0}")]
    Storage(#[from] StorageError),
}

pub struct ModelPusher {
    store: Arc<dyn ArtifactStore>,
    config: ModelPusherConfig,
}

impl ModelPusher {
    pub fn new(store: Arc<dyn ArtifactStore>, config: ModelPusherConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self))]
    pub async fn push(&self) -> Result<(), PushError> {
        let local_path = &self.config.local_model_path;
        if !artifact::validate(local_path) {
            return Err(PushError::InvalidArtifact(local_path.clone()));
        }

        tracing::info!("Starting model push to s3://{}/{}", self.config.bucket, self.config.key);
        self.store
            .upload(local_path, &self.config.bucket, &self.config.key)
            .await?;
        tracing::info!("Model pushed successfully");

        Ok(())
    }
}
