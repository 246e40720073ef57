//! Error types for dr-summary
//!
//! All failures surface immediately to the caller; there are no retries
//! anywhere in this crate.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dr-summary error types
#[derive(Error, Debug)]
pub enum Error {
    /// Session identifier does not decompose into `subject_id`, `date` and
    /// `session_idx`
    #[error("malformed session id {id:?}: {reason}")]
    MalformedSessionId {
        /// The offending identifier, verbatim
        id: String,
        /// What failed (component count, date format, index format)
        reason: String,
    },

    /// No component table at the resolved location
    #[error("component not found: {0}")]
    ComponentNotFound(String),

    /// Lazy cache key was never registered
    #[error("key not found in lazy cache: {0}")]
    KeyNotFound(String),

    /// A caller-supplied table is missing a column this crate requires
    #[error("missing column {column:?} (table has: {available:?})")]
    MissingColumn {
        /// The required column name
        column: String,
        /// Column names the table actually carries
        available: Vec<String>,
    },

    /// A column exists but has an unsupported data type
    #[error("column {column:?} has unsupported type {data_type}")]
    UnsupportedColumnType {
        /// The offending column name
        column: String,
        /// The Arrow data type found
        data_type: String,
    },

    /// Storage error (Parquet/Arrow)
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
