//! Error types for the polystatus service

use std::time::Duration;

/// Errors that can occur in the polystatus service
#[derive(Debug, thiserror::Error)]
pub enum PolyStatusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel configuration error: {0}")]
    ChannelConfig(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for polystatus operations
pub type Result<T> = std::result::Result<T, PolyStatusError>;
