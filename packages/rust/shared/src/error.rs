//! Error types for Prospector.
//!
//! Library crates use [`ProspectorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Prospector operations.
#[derive(Debug, thiserror::Error)]
pub enum ProspectorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Source page could not be reached or fetched. Per-record: the record
    /// degrades to an empty result and the batch continues.
    #[error("navigation error: {0}")]
    Navigation(String),

    /// Per-job deadline exceeded. The record degrades to an empty result.
    #[error("timeout after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    /// A pipeline process exceeded its wall-clock limit. Fatal for the run,
    /// distinct from a generic process failure so callers can suggest
    /// reducing scope.
    #[error(
        "pipeline exceeded the {limit_mins}-minute limit and was cancelled; try a smaller radius"
    )]
    ProcessTimeout { limit_mins: u64 },

    /// An external pipeline process failed to start or exited non-zero.
    #[error("process error: {0}")]
    Process(String),

    /// HTML parsing or selector error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (zero eligible records, malformed input).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Writing enriched results failed. Fatal for the run.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProspectorError>;

impl ProspectorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that abort the whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProcessTimeout { .. } | Self::Process(_) | Self::Persistence(_)
        )
    }
}
