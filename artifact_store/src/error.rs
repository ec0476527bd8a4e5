use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{operation} s3://{bucket}/{key} failed: {cause}")]
    Remote {
        operation: &'static str,
        bucket: String,
        key: String,
        cause: String,
    },
    #[error("{operation} {path} failed: {source}")]
    LocalIo {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("storage misconfigured: {0}")]
    Misconfigured(String),
}

impl StorageError {
    pub(crate) fn remote(
        operation: &'static str,
        bucket: &str,
        key: &str,
        cause: impl ToString,
    ) -> Self {
        StorageError::Remote {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn local_io(
        operation: &'static str,
        path: &std::path::Path,
        source: std::io::Error,
    ) -> Self {
        StorageError::LocalIo {
            operation,
            path: path.display().to_string(),
            source,
        }
    }
}
