//! Error types for the iland API client

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// Token acquisition failed, or both refresh and re-login failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The API answered with a status above 204.
    ///
    /// Displays as the server's message verbatim.
    #[error("{message}")]
    Request { status: u16, message: String },

    /// HTTP transport failure below the response layer
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Event socket transport failure
    #[error("socket transport error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    /// Event socket handshake or framing violation
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Task tracking gave up before the task settled
    #[error("task {task_id} did not settle after {polls} poll(s)")]
    TrackingTimeout { task_id: String, polls: u32 },

    /// Operation cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,
}

impl From<tungstenite::Error> for ApiError {
    fn from(err: tungstenite::Error) -> Self {
        ApiError::WebSocket(Box::new(err))
    }
}

impl ApiError {
    /// The session cannot be used until its credentials are fixed
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Authentication(_))
    }

    /// Network or socket failure below the HTTP layer
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::WebSocket(_))
    }

    /// HTTP status of a failed request, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
