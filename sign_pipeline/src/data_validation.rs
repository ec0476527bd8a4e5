use crate::config::DataValidationConfig;
use std::{collections::HashSet, io, path::PathBuf};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum DataValidationError {
    #[error("cannot list feature store {path}: {source}")]
    FeatureStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write validation status to {path}: {source}")]
    Status {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot copy data archive {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataValidationArtifact {
    pub validation_status: bool,
    pub missing_files: Vec<String>,
}

pub struct DataValidation {
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Checks the feature store for every required entry and records the
    /// outcome in the status marker file.
    pub fn validate_all_files_exist(&self) -> Result<Vec<String>, DataValidationError> {
        let feature_store = &self.config.feature_store_dir;
        let existing: HashSet<String> = std::fs::read_dir(feature_store)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
                    .collect()
            })
            .map_err(|source| DataValidationError::FeatureStore {
                path: feature_store.clone(),
                source,
            })?;

        let missing: Vec<String> = self
            .config
            .required_files
            .iter()
            .filter(|required| !existing.contains(*required))
            .cloned()
            .collect();

        let status_path = self.config.get_status_path();
        std::fs::create_dir_all(&self.config.validation_dir)
            .and_then(|_| {
                std::fs::write(
                    &status_path,
                    format!("Validation status: {}", missing.is_empty()),
                )
            })
            .map_err(|source| DataValidationError::Status {
                path: status_path.clone(),
                source,
            })?;

        Ok(missing)
    }

    #[instrument(skip(self))]
    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact, DataValidationError> {
        tracing::info!("Starting data validation");

        let missing_files = self.validate_all_files_exist()?;
        let artifact = DataValidationArtifact {
            validation_status: missing_files.is_empty(),
            missing_files,
        };
        tracing::info!("Data validation artifact: {:?}", artifact);

        if artifact.validation_status {
            self.copy_data_archive()?;
        } else {
            tracing::error!("Missing required files: {:?}", artifact.missing_files);
        }

        Ok(artifact)
    }

    fn copy_data_archive(&self) -> Result<(), DataValidationError> {
        let source = &self.config.data_zip_file;
        let copy_error = |source_err: io::Error| DataValidationError::Copy {
            path: source.clone(),
            source: source_err,
        };

        let file_name = source.file_name().ok_or_else(|| {
            copy_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "data archive path has no file name",
            ))
        })?;
        std::fs::create_dir_all(&self.config.copy_to).map_err(copy_error)?;

        let target = self.config.copy_to.join(file_name);
        std::fs::copy(source, &target).map_err(copy_error)?;
        tracing::info!("Copied {} to {}", source.display(), target.display());

        Ok(())
    }
}
