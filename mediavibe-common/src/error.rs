//! Common error types for the MediaVibe pipeline

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level error taxonomy
///
/// These are the stage-fatal errors: any of them aborts the run. Item-scoped
/// failures (enrichment, validation) are accumulated in `RunResult` instead
/// and never surface through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog source unreachable after exhausting retries
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Version store write failure (run aborts before the warehouse is touched)
    #[error("Version store write failed: {0}")]
    VersionWrite(String),

    /// Warehouse load failure (whole batch rolled back, safe to retry in full)
    #[error("Warehouse load failed: {0}")]
    Load(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (wraps serde_json::Error)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Run-level cancellation requested; in-flight work was drained first
    #[error("Run cancelled")]
    Cancelled,
}

impl Error {
    /// True for errors that leave the warehouse untouched and are safe to
    /// retry by re-running the whole pipeline.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_) | Error::Load(_))
    }
}
