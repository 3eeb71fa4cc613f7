//! Error types for docmine.
//!
//! Library crates use [`DocmineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docmine operations.
#[derive(Debug, thiserror::Error)]
pub enum DocmineError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Corpus or vocabulary parsing error (malformed rows, bad encodings).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Corpus writing error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Legacy-format conversion failed.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A `.docx` package could not be read.
    #[error("document error: {0}")]
    Document(String),

    /// A block stream was requested over a node that cannot contain blocks.
    #[error("unsupported container: {kind}")]
    UnsupportedContainer { kind: &'static str },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocmineError>;

impl DocmineError {
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
}
