//! Error types for the Braid library.
//!
//! All fallible operations return [`BraidError`] through the crate-wide
//! [`Result`] alias. Validation errors are raised before any backend is
//! contacted and can be detected with [`BraidError::is_validation`].
//!
//! # Examples
//!
//! ```
//! use braid::error::{BraidError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(BraidError::validation("query must not be empty"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => assert!(e.is_validation()),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Braid operations.
#[derive(Error, Debug)]
pub enum BraidError {
    /// I/O errors (corpus files, CLI output).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The caller supplied a malformed request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A search backend failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A search backend did not answer before the deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The result cache could not be read or written.
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with BraidError.
pub type Result<T> = std::result::Result<T, BraidError>;

impl BraidError {
    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        BraidError::Validation(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        BraidError::InvalidConfig(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        BraidError::Backend(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        BraidError::Timeout(msg.into())
    }

    /// Create a new cache error.
    pub fn cache<S: Into<String>>(msg: S) -> Self {
        BraidError::Cache(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        BraidError::Other(msg.into())
    }

    /// Whether this error was caused by caller input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, BraidError::Validation(_) | BraidError::InvalidConfig(_))
    }
}
