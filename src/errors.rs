//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the songbook search service, covering the
//! document fetch/parse pipeline, the query engine and the API boundary.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from document sources, parsers and the cache
//! - **Output**: Structured error types with context for logging
//! - **Error Categories**: Documents, Parsing, Cache, Configuration, API
//!
//! ## Key Features
//! - One error enum shared by every component
//! - Automatic conversion from transport and serialization errors
//! - `is_recoverable` drives the cache's stale-serve decision
//! - User-facing text is always generic; detail stays in the logs

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SongbookError>;

/// Error types for the songbook search service
#[derive(Debug, Error)]
pub enum SongbookError {
    /// Document could not be fetched and no cached snapshot exists.
    /// Fatal for the request; the user sees a generic failure message.
    #[error("document '{document}' is unavailable")]
    DocumentUnavailable { document: String },

    /// Transient fetch failure (network, auth, upstream 5xx). Recovered by
    /// serving the stale snapshot when one exists.
    #[error("fetching document '{document}' failed: {details}")]
    FetchFailed { document: String, details: String },

    /// The document fetched fine but produced no content blocks. Downstream
    /// treats this as a valid empty entity list, not a failure.
    #[error("document '{document}' is empty")]
    EmptyDocument { document: String },

    /// A single block failed positional or marker parsing. The block is
    /// skipped with a warning; the rest of the document survives.
    #[error("malformed block {index} in document '{document}': {details}")]
    MalformedBlock {
        document: String,
        index: usize,
        details: String,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Internal system errors
    #[error("internal error: {message}")]
    Internal { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SongbookError {
    /// Whether the cache may recover from this error by serving stale data
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SongbookError::FetchFailed { .. } | SongbookError::Http(_)
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SongbookError::DocumentUnavailable { .. }
            | SongbookError::FetchFailed { .. }
            | SongbookError::EmptyDocument { .. }
            | SongbookError::Http(_) => "documents",
            SongbookError::MalformedBlock { .. } | SongbookError::Json(_) => "parsing",
            SongbookError::Config { .. } | SongbookError::Toml(_) => "configuration",
            SongbookError::Internal { .. } | SongbookError::Io(_) => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_are_recoverable() {
        let err = SongbookError::FetchFailed {
            document: "songs".to_string(),
            details: "timeout".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "documents");
    }

    #[test]
    fn missing_document_is_fatal() {
        let err = SongbookError::DocumentUnavailable {
            document: "songs".to_string(),
        };
        assert!(!err.is_recoverable());
    }
}
