//! Errors raised while resolving the `serio` configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Rendering the effective configuration back to TOML failed.
    #[error("cannot render configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Parsed, but unusable as line settings.
    #[error("{key}: {message}")]
    ValidationError { key: String, message: String },

    #[error("{var}: {message}")]
    EnvParseError { var: String, message: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
