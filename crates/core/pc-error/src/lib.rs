//! Error types for prefetch-cursor.
//!
//! This crate provides:
//! - [`CursorError`] - Top-level error enum for cursor operations
//! - [`FetchError`] - Failures reported by (or on behalf of) an index fetcher
//! - [`Result`] - Alias used by the fetcher and reset hook traits

use thiserror::Error;

/// Top-level error type for prefetch-cursor.
#[derive(Error, Debug)]
pub enum CursorError {
    /// Fetch errors (source unavailable, missing index)
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reset hook failed
    #[error("Reset failed: {0}")]
    Reset(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fetch-related errors.
///
/// These never escape the cursor as errors: a failed fetch is delivered to the
/// consumer as a failed slot at that position.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The source has no item at this index
    #[error("Index {0} not found")]
    NotFound(u64),

    /// The source reported an error
    #[error("Source error: {0}")]
    Source(String),

    /// The source did not answer in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The fetch task ended without publishing a result
    #[error("Fetch for index {0} was abandoned")]
    Abandoned(u64),
}

impl CursorError {
    /// Returns the underlying fetch error, if this is one.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias using [`CursorError`].
pub type Result<T> = std::result::Result<T, CursorError>;
