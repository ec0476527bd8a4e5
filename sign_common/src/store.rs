use crate::config::{StorageBackend, StorageConfig};
use artifact_store::{ArtifactStore, LocalArtifactStore, S3ArtifactStore, StorageError};
use std::sync::Arc;

pub async fn build_store(storage: &StorageConfig) -> Result<Arc<dyn ArtifactStore>, StorageError> {
    match storage.backend {
        StorageBackend::S3 => Ok(Arc::new(S3ArtifactStore::from_env().await)),
        StorageBackend::Local => {
            let root = storage.local_root.clone().ok_or_else(|| {
                StorageError::Misconfigured(
                    "storage.local_root is required for the local backend".into(),
                )
            })?;
            Ok(Arc::new(LocalArtifactStore::new(root)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_backend_requires_root() {
        let storage = StorageConfig {
            backend: StorageBackend::Local,
            local_root: None,
        };
        assert!(matches!(
            build_store(&storage).await.err(),
            Some(StorageError::Misconfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_local_backend_serves_from_root() {
        let root = tempdir().unwrap();
        let object = root.path().join("models/best.onnx");
        std::fs::create_dir_all(object.parent().unwrap()).unwrap();
        std::fs::write(&object, b"onnx").unwrap();

        let store = build_store(&StorageConfig {
            backend: StorageBackend::Local,
            local_root: Some(root.path().to_path_buf()),
        })
        .await
        .unwrap();

        assert_eq!(store.read_bytes("models", "best.onnx").await.unwrap(), b"onnx");
    }
}
