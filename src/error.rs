//! Error types for the sales insight orchestrator

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid pipeline: {0}")]
    ValidationError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Query timed out after {0}s")]
    TimeoutError(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] mongodb::error::Error),

    #[error("BSON encoding error: {0}")]
    BsonError(#[from] mongodb::bson::ser::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Short machine-readable kind, returned to clients next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransportError(_) | Self::HttpError(_) => "transport",
            Self::DecodeError(_) => "decode",
            Self::ValidationError(_) | Self::BsonError(_) => "validation",
            Self::ExecutionError(_) | Self::DatabaseError(_) => "execution",
            Self::TimeoutError(_) => "timeout",
            Self::ConfigError(_) | Self::IoError(_) => "config",
        }
    }

    /// HTTP status used when this error ends a request
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            "transport" | "decode" | "validation" => StatusCode::BAD_GATEWAY,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
