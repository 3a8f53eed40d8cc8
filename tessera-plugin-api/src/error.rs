//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Manifest failed validation at registration time
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Initialization could not complete
    #[error("Initialization failed: {0}")]
    Init(String),

    /// Authentication request rejected by the host
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A capability the plugin needs was not provided by the host
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create an initialization error
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}
