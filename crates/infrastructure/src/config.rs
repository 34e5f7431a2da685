//! Layered configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, an optional file
//! (TOML, JSON or YAML, chosen by extension), then `APIPROBE_` environment
//! variables such as `APIPROBE_EXECUTION__MAX_CONCURRENT_TESTS=8`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use apiprobe_domain::{DomainError, ExecutionConfig, TaskScheduleConfig};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "APIPROBE";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged configuration is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Test execution settings.
    pub execution: ExecutionConfig,
    /// Scheduler settings.
    pub scheduler: TaskScheduleConfig,
}

impl AppConfig {
    /// Loads configuration from defaults, `file` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, or the merged
    /// values fail validation.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Same as [`AppConfig::load`], reading variables from `env` instead of
    /// the process environment when given.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`].
    pub fn load_with_env(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = file {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        let environment = match env {
            Some(vars) => environment.source(Some(vars.into_iter().collect())),
            None => environment,
        };

        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}
