//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`EnrichmentError`], [`MediaError`], [`ConfigError`])
//!   for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! Per-track and per-provider failures are not errors at this level: they
//! are recorded in job reports and logs. Only bad input and failures that
//! stop a whole operation surface here.
//!
//! # Example
//!
//! ```ignore
//! use crate_digger::error::{Error, Result};
//!
//! fn check(max_concurrent: usize) -> Result<()> {
//!     if max_concurrent == 0 {
//!         return Err(Error::validation("max_concurrent must be at least 1"));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::enrichment::EnrichmentError;
use crate::media::MediaError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid input
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Metadata reading/writing error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Metadata aggregation error
    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    /// Resolve/download/convert error
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is a bad-input error (possibly wrapped in context)
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Enrichment(EnrichmentError::Validation(_)) => true,
            Self::WithContext { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, MediaError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Media(e).context(ctx))
    }
}
