use serde::Deserialize;
use sign_common::config::{
    configuration_directory, current_environment, deserialize_log_level, env_overrides,
    load_layered,
};
use std::path::{Path, PathBuf};

pub use sign_common::config::{Environment, LogLevel, StorageBackend, StorageConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_service_name() -> String {
    "Sign Language API".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub source: SourceKind,
    pub model_dir: PathBuf,
    pub onnx_file: String,
    pub labels_file: PathBuf,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ModelConfig {
    pub fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InferenceConfig {
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

// Kept low so marginal gestures still surface as the best guess.
fn default_confidence_floor() -> f32 {
    0.005
}

fn default_iou_threshold() -> f32 {
    0.45
}

fn default_max_detections() -> usize {
    10
}

fn default_input_size() -> u32 {
    640
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            iou_threshold: default_iou_threshold(),
            max_detections: default_max_detections(),
            input_size: default_input_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl InferenceConfig {
    /// Rejects thresholds and sizes the detector cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |field: &str, value: String, expected: &str| {
            Err(config::ConfigError::Message(format!(
                "inference.{} = {} is invalid, expected {}",
                field, value, expected
            )))
        };

        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return invalid(
                "confidence_floor",
                self.confidence_floor.to_string(),
                "a value in [0, 1]",
            );
        }
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return invalid(
                "iou_threshold",
                self.iou_threshold.to_string(),
                "a value in (0, 1]",
            );
        }
        if self.max_detections == 0 {
            return invalid("max_detections", "0".into(), "at least 1");
        }
        if !(MIN_INPUT_SIZE..=MAX_INPUT_SIZE).contains(&self.input_size)
            || self.input_size % INPUT_STRIDE != 0
        {
            return invalid(
                "input_size",
                self.input_size.to_string(),
                "a multiple of 32 between 32 and 4096",
            );
        }
        if self.timeout_ms == 0 {
            return invalid("timeout_ms", "0".into(), "at least 1");
        }

        Ok(())
    }
}

const INPUT_STRIDE: u32 = 32;
const MIN_INPUT_SIZE: u32 = 32;
const MAX_INPUT_SIZE: u32 = 4096;

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    load_configuration(
        &configuration_directory()?,
        &current_environment()?,
        env_overrides("SIGN"),
    )
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: &Environment,
    overrides: config::Environment,
) -> Result<Config, config::ConfigError> {
    let config: Config = load_layered(configuration_directory, environment, overrides)?;
    config.inference.validate()?;

    Ok(config)
}
