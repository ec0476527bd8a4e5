use serde::Deserialize;
use sign_common::config::{
    configuration_directory, current_environment, deserialize_log_level, env_overrides,
    load_layered, Environment, LogLevel, StorageConfig,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model_pusher: ModelPusherConfig,
    pub data_validation: DataValidationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelPusherConfig {
    pub local_model_path: PathBuf,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataValidationConfig {
    pub feature_store_dir: PathBuf,
    pub validation_dir: PathBuf,
    #[serde(default = "default_status_file")]
    pub status_file: String,
    pub required_files: Vec<String>,
    pub data_zip_file: PathBuf,
    #[serde(default = "default_copy_to")]
    pub copy_to: PathBuf,
}

fn default_status_file() -> String {
    "status.txt".to_string()
}

fn default_copy_to() -> PathBuf {
    PathBuf::from(".")
}

impl DataValidationConfig {
    pub fn get_status_path(&self) -> PathBuf {
        self.validation_dir.join(&self.status_file)
    }
}

pub fn get_configuration() -> Result<PipelineConfig, config::ConfigError> {
    load_configuration(
        &configuration_directory()?,
        &current_environment()?,
        env_overrides("PIPELINE"),
    )
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: &Environment,
    overrides: config::Environment,
) -> Result<PipelineConfig, config::ConfigError> {
    load_layered(configuration_directory, environment, overrides)
}
