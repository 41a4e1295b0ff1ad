// Error handling for modelfactory

use thiserror::Error;

/// A failed transport call, as reported by the transport
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status when the server answered, `None` for connection-level failures
    pub status: Option<u16>,
    pub message: String,
    /// Response body of a rejected request, if any
    pub body: Option<serde_json::Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Errors surfaced by a resource call.
///
/// Cloneable so one settled result can be handed to every caller that shared
/// the same in-flight request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type ResourceResult<T> = Result<T, ResourceError>;
