//! Error types for price_updater

use thiserror::Error;

/// Unified error type for price_updater operations
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Non-success response from the hosted database
    #[error("HTTP error: {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Local database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Another thread panicked while holding the database connection
    #[error("Database connection lock poisoned")]
    LockPoisoned,
    /// Stored value could not be interpreted
    #[error("Invalid stored value: {0}")]
    InvalidData(String),
    /// The card catalog could not be read; aborts the run
    #[error("Failed to fetch cards: {0}")]
    CatalogFetchFailed(String),
    /// Run log row could not be written
    #[error("Failed to persist run log: {0}")]
    LogPersistenceFailed(String),
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias for price_updater operations
pub type Result<T> = std::result::Result<T, UpdaterError>;
