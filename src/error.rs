use thiserror::Error;

/// Main error type for the match engine
#[derive(Error, Debug)]
pub enum MatchEngineError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record store errors that are not raw SQLite failures
    #[error("Store error: {0}")]
    Store(String),

    /// Rejected card input
    #[error("Invalid card: {0}")]
    Validation(String),

    /// Missing card
    #[error("Card not found: {0}")]
    NotFound(String),

    /// Caller does not own the card
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Relist token unknown or already used
    #[error("Relist link is invalid")]
    InvalidRelistToken,

    /// Relist token past its expiry
    #[error("Relist link has expired")]
    ExpiredRelistToken,

    /// Bad environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<String> for MatchEngineError {
    fn from(s: String) -> Self {
        MatchEngineError::Other(s)
    }
}

impl From<&str> for MatchEngineError {
    fn from(s: &str) -> Self {
        MatchEngineError::Other(s.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MatchEngineError>;
