//! Error types for reticle_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using reticle_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, editing and saving resources.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A resource without an owning pack was asked to do something that
    /// needs a destination, such as saving.
    #[error("Floating asset {path}: resources without a pack cannot be saved")]
    FloatingAsset { path: PathBuf },

    /// A path or named lookup did not resolve.
    #[error("Not found: {path} ({reason})")]
    NotFound { path: String, reason: String },

    /// A path expression was malformed for the requested operation.
    #[error("Ambiguous path: {path} ({reason})")]
    AmbiguousPath { path: String, reason: String },

    /// Document could not be parsed, neither strictly nor with comments stripped.
    #[error("Malformed document at {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Pack configuration file is invalid.
    #[error("Invalid config at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

impl Error {
    /// Create a FloatingAsset error.
    pub fn floating_asset(path: impl Into<PathBuf>) -> Self {
        Error::FloatingAsset { path: path.into() }
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an AmbiguousPath error.
    pub fn ambiguous_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::AmbiguousPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a MalformedDocument error.
    pub fn malformed_document(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::MalformedDocument {
            path: path.into(),
            source,
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether this is an AmbiguousPath error.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::AmbiguousPath { .. })
    }

    /// Whether this is a FloatingAsset error.
    pub fn is_floating(&self) -> bool {
        matches!(self, Error::FloatingAsset { .. })
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let missing = Error::not_found("a/b", "no key b");
        let ambiguous = Error::ambiguous_path("a/b", "missing wildcard");
        let floating = Error::floating_asset("x.json");

        assert!(missing.is_not_found() && !missing.is_ambiguous());
        assert!(ambiguous.is_ambiguous() && !ambiguous.is_not_found());
        assert!(floating.is_floating() && !floating.is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::not_found("a/b", "no key b");
        assert_eq!(err.to_string(), "Not found: a/b (no key b)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
