use crate::{error::StorageError, ArtifactStore};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{primitives::ByteStream, Client};
use std::path::Path;
use tracing::instrument;

#[derive(Clone, Debug)]
pub struct S3ArtifactStore {
    client: Client,
}

impl S3ArtifactStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS credential and region chain.
    pub async fn from_env() -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&aws_config))
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        tracing::info!("Uploading {} to s3://{}/{}", local_path.display(), bucket, key);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::remote("upload", bucket, key, e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 upload failed: {}", e);
                StorageError::remote("upload", bucket, key, e)
            })?;

        tracing::info!("Upload successful");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        tracing::info!("Downloading s3://{}/{} to {}", bucket, key, local_path.display());

        let bytes = self.read_bytes(bucket, key).await?;

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::local_io("download", parent, e))?;
        }
        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|e| StorageError::local_io("download", local_path, e))?;

        tracing::info!("Download successful ({} bytes)", bytes.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(key)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| StorageError::remote("exists", bucket, key, e))?;

        Ok(output.key_count().unwrap_or(0) > 0)
    }

    #[instrument(skip(self))]
    async fn read_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 read failed: {}", e);
                StorageError::remote("read", bucket, key, e)
            })?;

        let body = result
            .body
            .collect()
            .await
            .map_err(|e| StorageError::remote("read", bucket, key, e))?;

        Ok(body.into_bytes().to_vec())
    }
}
