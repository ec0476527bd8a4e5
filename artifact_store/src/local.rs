use crate::{error::StorageError, ArtifactStore};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

/// Filesystem-backed store: `<root>/<bucket>/<key>`.
///
/// Used for local development and for exercising the serving path
/// without network access.
#[derive(Clone, Debug)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(StorageError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(format!("{}/{}", bucket, key)));
        }
        Ok(self.bucket_path(bucket)?.join(relative))
    }
}

async fn copy_file(
    operation: &'static str,
    from: &Path,
    to: &Path,
) -> Result<(), StorageError> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::local_io(operation, parent, e))?;
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| StorageError::local_io(operation, from, e))?;
    Ok(())
}

fn collect_keys(dir: &Path, base: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_keys(&path, base, keys)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let target = self.object_path(bucket, key)?;
        copy_file("upload", local_path, &target).await?;
        tracing::info!("Stored {} as {}/{}", local_path.display(), bucket, key);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let source = self.object_path(bucket, key)?;
        copy_file("download", &source, local_path).await?;
        tracing::info!("Fetched {}/{} into {}", bucket, key, local_path.display());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let bucket_dir = self.bucket_path(bucket)?;
        if !bucket_dir.is_dir() {
            return Ok(false);
        }

        let prefix = key.to_string();
        let walk_dir = bucket_dir.clone();
        let keys = tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            collect_keys(&walk_dir, &walk_dir, &mut keys).map(|_| keys)
        })
        .await
        .map_err(|e| StorageError::local_io("exists", &bucket_dir, std::io::Error::other(e)))?
        .map_err(|e| StorageError::local_io("exists", &bucket_dir, e))?;

        Ok(keys.iter().any(|k| k.starts_with(&prefix)))
    }

    #[instrument(skip(self))]
    async fn read_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let source = self.object_path(bucket, key)?;
        tokio::fs::read(&source)
            .await
            .map_err(|e| StorageError::local_io("read", &source, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_then_download_is_byte_identical() {
        let root = tempdir().unwrap();
        let work = tempdir().unwrap();
        let store = LocalArtifactStore::new(root.path());

        let original: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let source = work.path().join("best.onnx");
        std::fs::write(&source, &original).unwrap();

        store
            .upload(&source, "models", "sign_language/latest/best.onnx")
            .await
            .unwrap();

        let fresh = work.path().join("fresh/copy.onnx");
        store
            .download("models", "sign_language/latest/best.onnx", &fresh)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&fresh).unwrap(), original);
    }

    #[tokio::test]
    async fn test_exists_matches_key_prefix() {
        let root = tempdir().unwrap();
        let work = tempdir().unwrap();
        let store = LocalArtifactStore::new(root.path());

        assert!(!store.exists("models", "sign_language").await.unwrap());

        let source = work.path().join("best.onnx");
        std::fs::write(&source, b"weights").unwrap();
        store
            .upload(&source, "models", "sign_language/latest/best.onnx")
            .await
            .unwrap();

        assert!(store.exists("models", "sign_language/latest").await.unwrap());
        assert!(store
            .exists("models", "sign_language/latest/best.onnx")
            .await
            .unwrap());
        assert!(!store.exists("models", "other").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_bytes_of_missing_object_fails() {
        let root = tempdir().unwrap();
        let store = LocalArtifactStore::new(root.path());

        let err = store.read_bytes("models", "missing.onnx").await.unwrap_err();
        assert!(matches!(err, StorageError::LocalIo { operation: "read", .. }));
    }

    #[tokio::test]
    async fn test_rejects_keys_escaping_the_bucket() {
        let root = tempdir().unwrap();
        let store = LocalArtifactStore::new(root.path());

        let err = store.read_bytes("models", "../secret").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
