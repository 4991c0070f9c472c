//! Error types for config parsing and notification validation.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating `warmpool.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("unknown pool state: {0:?} (expected RUNNING, STOPPED or HIBERNATED)")]
    UnknownPoolState(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A lifecycle notification that cannot be turned into a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification is missing required field {0}")]
    MissingField(&'static str),
}
