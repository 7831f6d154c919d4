//! Error types for burnline-core

use thiserror::Error;

/// Main error type for the burnline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure fetching current state or activity from a data source.
    ///
    /// Fatal to the whole analytics request; never retried here.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Sprint not found
    #[error("sprint not found: {0}")]
    SprintNotFound(String),

    /// Objective not found
    #[error("objective not found: {0}")]
    ObjectiveNotFound(String),

    /// Analysis window is malformed (end before start, zero days)
    #[error("invalid analysis window: {0}")]
    InvalidWindow(String),

    /// Caller cancelled the analytics request
    #[error("analytics request cancelled")]
    Cancelled,

    /// Analytics request exceeded its time budget (milliseconds)
    #[error("analytics request timed out after {0}ms")]
    Timeout(u64),

    /// A background analytics task panicked or was aborted
    #[error("analytics task failed: {0}")]
    Task(String),
}

/// Result type alias for burnline-core
pub type Result<T> = std::result::Result<T, Error>;
