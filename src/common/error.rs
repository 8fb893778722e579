//! Error types for the application.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Restart error: {0}")]
    Restart(#[from] RestartError),
}

/// Configuration-related errors.
///
/// These are never fatal to the running relay; malformed fields are
/// corrected and logged instead. They only surface as hard errors when
/// the config document itself cannot be read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Link resolution errors, reported by the verification pass.
///
/// A link that fails to resolve is excluded from routing until the next
/// verification pass; the error is informational.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Channel '{channel}' not found on the platform")]
    ChannelNotFound { channel: String },

    #[error("Link has an empty channel reference")]
    EmptyReference,
}

/// Outbound delivery errors. Logged per destination, never propagated
/// into the inbound pipeline.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to send to channel {channel_id}: {message}")]
    SendFailed { channel_id: u64, message: String },

    #[error("Missing permission '{permission}' in channel {channel_id}")]
    PermissionDenied { channel_id: u64, permission: String },

    #[error("Outbound queue for {network} is closed")]
    QueueClosed { network: &'static str },
}

/// Errors from the critical-change restart path.
#[derive(Debug, Error)]
pub enum RestartError {
    #[error("Restart already in progress")]
    AlreadyInProgress,

    #[error("Reconnect failed: {message}")]
    ReconnectFailed { message: String },
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for link resolution.
pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Result type alias for outbound delivery.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;
