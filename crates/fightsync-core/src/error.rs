use thiserror::Error;

/// Application-wide error types for fightsync.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The page did not have the structure the schema expects
    /// (the base selector matched nothing).
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// A schema file is missing, unreadable, or contains an invalid selector/pattern.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Database temporarily unreachable (pool exhausted, connection dropped).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::RateLimitExceeded
            | AppError::StorageUnavailable(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
                    || msg.starts_with("HTTP 5")
                    || msg.starts_with("HTTP 429")
            }
            _ => false,
        }
    }

    /// Returns true if the error came from the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::StorageUnavailable(_)
        )
    }
}
