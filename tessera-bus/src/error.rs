//! Event bus error types

use thiserror::Error;

/// Failure reported by a single event handler.
///
/// Handler failures never escape [`EventBus::emit`](crate::EventBus::emit);
/// they are logged and re-published on [`ERROR_TOPIC`](crate::ERROR_TOPIC).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler returned an error
    #[error("{0}")]
    Failed(String),

    /// Handler panicked during dispatch
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Payload did not have the shape the handler expected
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl HandlerError {
    /// Create a generic handler failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

/// Errors returned by bus operations that can fail before dispatch
#[derive(Error, Debug)]
pub enum BusError {
    /// A typed payload could not be converted to JSON
    #[error("failed to serialize payload for '{topic}': {source}")]
    Serialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}
