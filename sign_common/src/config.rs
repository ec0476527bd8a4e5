use serde::{de::DeserializeOwned, Deserialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

/// `APP_ENVIRONMENT`, defaulting to `local`.
pub fn current_environment() -> Result<Environment, config::ConfigError> {
    std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)
}

pub fn configuration_directory() -> Result<PathBuf, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    Ok(base_path.join("configuration"))
}

/// Environment variable source using `<PREFIX>_SECTION__FIELD` names.
pub fn env_overrides(prefix: &str) -> config::Environment {
    config::Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
}

/// Layers `base.yaml`, then the optional `<environment>.yaml`, then
/// `overrides`. Later layers win.
pub fn load_layered<T: DeserializeOwned>(
    configuration_directory: &Path,
    environment: &Environment,
    overrides: config::Environment,
) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(overrides)
        .build()?
        .try_deserialize::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize)]
    struct Layered {
        #[serde(deserialize_with = "deserialize_log_level")]
        log_level: LogLevel,
        server: Server,
    }

    #[derive(Debug, Deserialize)]
    struct Server {
        host: String,
        port: u16,
    }

    fn write_configuration(dir: &Path) {
        std::fs::write(
            dir.join("base.yaml"),
            "log_level: info\nserver:\n  host: 0.0.0.0\n  port: 8000\n",
        )
        .unwrap();
        std::fs::write(dir.join("local.yaml"), "log_level: debug\n").unwrap();
    }

    fn overrides(vars: &[(&str, &str)]) -> config::Environment {
        env_overrides("SIGN").source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_environment_file_overlays_base() {
        let dir = tempdir().unwrap();
        write_configuration(dir.path());

        let layered: Layered =
            load_layered(dir.path(), &Environment::Local, overrides(&[])).unwrap();

        assert!(matches!(layered.log_level, LogLevel::Debug));
        assert_eq!(layered.server.host, "0.0.0.0");
        assert_eq!(layered.server.port, 8000);
    }

    #[test]
    fn test_missing_environment_file_keeps_base() {
        let dir = tempdir().unwrap();
        write_configuration(dir.path());

        let layered: Layered =
            load_layered(dir.path(), &Environment::Production, overrides(&[])).unwrap();

        assert!(matches!(layered.log_level, LogLevel::Info));
    }

    #[test]
    fn test_env_vars_override_files() {
        let dir = tempdir().unwrap();
        write_configuration(dir.path());

        let layered: Layered = load_layered(
            dir.path(),
            &Environment::Local,
            overrides(&[("SIGN_SERVER__PORT", "9100"), ("OTHER_SERVER__PORT", "1")]),
        )
        .unwrap();

        assert_eq!(layered.server.port, 9100);
        assert!(matches!(layered.log_level, LogLevel::Debug));
    }

    #[test]
    fn test_missing_base_is_an_error() {
        let dir = tempdir().unwrap();
        let result: Result<Layered, _> =
            load_layered(dir.path(), &Environment::Local, overrides(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert!(matches!(
            LogLevel::try_from("DEBUG".to_string()),
            Ok(LogLevel::Debug)
        ));
        assert!(LogLevel::try_from("trace".to_string()).is_err());
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
