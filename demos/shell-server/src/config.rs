//! Server configuration file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use remote_shell_session::SessionConfig;
use remote_shell_transport::TransportConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Contents of the TOML file: `[session]`, `[transport]` and
/// `[postprocess]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub session: SessionConfig,
    pub transport: TransportConfig,
    pub postprocess: PostprocessConfig,
}

/// Settings for the built-in post-processors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Directory the `save` post-processor writes into.
    pub output_dir: PathBuf,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path`, or defaults when no file is given.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that read timeouts and the output directory are usable.
    ///
    /// # Errors
    /// Returns error naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.input_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "transport.input_poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.session.thread_name_prefix.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "session.thread_name_prefix must not be empty".to_string(),
            });
        }
        if !self.postprocess.output_dir.is_dir() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "postprocess.output_dir '{}' is not a directory",
                    self.postprocess.output_dir.display()
                ),
            });
        }
        Ok(())
    }
}
