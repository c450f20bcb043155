//! Configuration-loading error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, parsing, or resolving a configuration
/// document (spec §6 "Configuration file").
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse configuration JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("configuration dependency graph contains a cycle at '{0}'")]
    CyclicConfiguration(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias used by configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for metacall_value::MetaCallError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::CyclicConfiguration(name) => {
                metacall_value::ErrorKind::CyclicConfiguration(name).into()
            }
            other => metacall_value::ErrorKind::BadArgument(other.to_string()).into(),
        }
    }
}
