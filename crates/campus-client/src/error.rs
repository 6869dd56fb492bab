use std::time::Duration;

use campus_types::QueryError;

/// Failures crossing the gateway boundary. Cloneable so it can sit inside
/// watched UI state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found")]
    NotFound,
    #[error("row already exists")]
    Duplicate,
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid response: {0}")]
    Decode(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(e: anyhow::Error) -> Self {
        GatewayError::Store(format!("{e:#}"))
    }
}
