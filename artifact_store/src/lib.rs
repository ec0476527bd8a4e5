mod error;
mod local;
mod s3;

pub use error::StorageError;
pub use local::LocalArtifactStore;
pub use s3::S3ArtifactStore;

use async_trait::async_trait;
use std::path::Path;

/// Blob storage for model artifacts, addressed by `(bucket, key)`.
///
/// Every operation is a single attempt. Failures carry the operation name
/// and the object location so callers can surface them as they are.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError>;

    async fn download(&self, bucket: &str, key: &str, local_path: &Path)
        -> Result<(), StorageError>;

    /// True when at least one object key starts with `key`.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    async fn read_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
}
