//! Daemon configuration.
//!
//! Settings come from `ponicwatch.toml` in the working directory, with
//! environment variables taking precedence over the file. A missing file is
//! not an error; every section has defaults good enough for a first run.

use std::path::Path;

use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "ponicwatch.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite:ponicwatch.db?mode=rwc";
const DEFAULT_LOG_FILTER: &str = "ponicwatchd=info,ponicwatch=info";
const DEFAULT_GRACE_SECONDS: u64 = 10;
const MAX_GRACE_SECONDS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds to wait for in-flight jobs before forcing hardware cleanup.
    pub grace_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_seconds: DEFAULT_GRACE_SECONDS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PONICWATCH_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(filter) = std::env::var("PONICWATCH_LOG").or_else(|_| std::env::var("RUST_LOG")) {
            self.logging.filter = filter;
        }
        if let Ok(grace) = std::env::var("PONICWATCH_GRACE_SECONDS")
            && let Ok(seconds) = grace.parse()
        {
            self.shutdown.grace_seconds = seconds;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Validation(
                "database.url must not be empty".into(),
            ));
        }
        if self.shutdown.grace_seconds > MAX_GRACE_SECONDS {
            return Err(ConfigError::Validation(format!(
                "shutdown.grace_seconds must be at most {MAX_GRACE_SECONDS}"
            )));
        }
        Ok(())
    }
}
