//! Error type shared by configuration parsing, validation, mutation and loading.

/// Errors raised while building, changing or installing a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error (unknown fields included).
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration violates a structural or referential rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A route/receiver change request was rejected before validation.
    #[error("{0}")]
    InvalidChange(String),

    /// A mutation was attempted before any configuration was installed.
    #[error("found an empty config in coordinator")]
    NotInitialized,

    /// The remote config source could not be reached or decoded.
    #[error("remote config source: {0}")]
    Remote(String),

    /// A subscriber rejected the newly installed configuration.
    #[error("one or more config change subscribers failed to apply new config: {0}")]
    Subscriber(String),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ConfigError::Validation(msg.into())
    }
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
