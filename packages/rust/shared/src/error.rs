//! Error types for lawsite.
//!
//! Library crates use [`LawsiteError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lawsite operations.
#[derive(Debug, thiserror::Error)]
pub enum LawsiteError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A recognized content document is missing required structure
    /// (main region aside, e.g. the authenticate marker or og:url meta).
    /// Fatal for the whole run.
    #[error("malformed document {path:?}: {message}")]
    Document { path: PathBuf, message: String },

    /// Jurisdiction metadata lookup failure (missing marker file,
    /// unreadable meta.json). Recoverable at the single-jurisdiction level.
    #[error("metadata error for {jurisdiction}: {message}")]
    Metadata {
        jurisdiction: String,
        message: String,
    },

    /// Git operation failure, reported upward through the state channel.
    #[error("git error: {0}")]
    Git(String),

    /// The working tree had no changes to commit. Treated as success
    /// by the deploy stage, never reported as a failure.
    #[error("nothing to commit")]
    NothingToCommit,

    /// HTTP error while fetching the template skeleton.
    #[error("http error: {0}")]
    Http(String),

    /// State-channel envelope decoding error.
    #[error("state error: {message}")]
    State { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LawsiteError>;

impl LawsiteError {
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

    /// Create a malformed-document error tied to a source path.
    pub fn document(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a per-jurisdiction metadata error.
    pub fn metadata(jurisdiction: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Metadata {
            jurisdiction: jurisdiction.into(),
            message: msg.into(),
        }
    }

    /// Create a state-channel error from any displayable message.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State {
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
}
