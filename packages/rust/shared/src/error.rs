//! Error types for Folio.
//!
//! Library crates use [`FolioError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Folio operations.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Source document could not be decoded or parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Structural extraction failed for a single writing.
    #[error("extraction error in {file}: {message}")]
    Extraction { file: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Manifest validation error (broken invariant, schema mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON serialization of the manifest failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
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

    /// Create an extraction error tied to a source file name.
    pub fn extraction(file: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            file: file.into(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FolioError::config("unknown key `foo`");
        assert_eq!(err.to_string(), "config error: unknown key `foo`");

        let err = FolioError::extraction("psalms.html", "body missing");
        assert_eq!(
            err.to_string(),
            "extraction error in psalms.html: body missing"
        );

        let err = FolioError::validation("duplicate block id `intro-1`");
        assert!(err.to_string().contains("intro-1"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = FolioError::io("/tmp/missing.html", source);
        assert!(err.to_string().contains("/tmp/missing.html"));
        assert!(err.to_string().contains("gone"));
    }
}
