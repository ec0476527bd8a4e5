use std::path::Path;

/// Reports whether a materialized model artifact can be served: the path
/// must exist, be a regular file, and hold at least one byte.
///
/// A missing path is a normal negative result, never an error.
pub fn validate(path: &Path) -> bool {
    tracing::info!("Starting model artifact validation for {}", path.display());

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!("Model file not found: {}", path.display());
            return false;
        }
        Err(e) => {
            tracing::error!("Cannot read model file metadata {}: {}", path.display(), e);
            return false;
        }
    };

    if !metadata.is_file() {
        tracing::error!("Model path is not a file: {}", path.display());
        return false;
    }

    if metadata.len() == 0 {
        tracing::error!("Model file is empty: {}", path.display());
        return false;
    }

    tracing::info!("Model artifact validation successful");
    true
}
