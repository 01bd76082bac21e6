//! Error types for the token index builder.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for token index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building a token index.
///
/// Every per-path variant names the entry it came from so callers can decide
/// whether a partial index is acceptable.
#[derive(Error, Debug)]
pub enum IndexError {
    /// File could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be resolved.
    #[error("failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory could not be listed.
    #[error("failed to list {}: {source}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read failed part way through a file.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured pattern is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A child task panicked or was aborted.
    #[error("task under {} failed: {message}", path.display())]
    Task { path: PathBuf, message: String },

    /// The blocking entry point could not start its runtime.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// IO error outside of a walk, such as reading an options file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    /// The path this error is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Open { path, .. }
            | Self::Stat { path, .. }
            | Self::List { path, .. }
            | Self::Read { path, .. }
            | Self::Task { path, .. } => Some(path),
            Self::Pattern { .. } | Self::Runtime(_) | Self::Io(_) | Self::Serialization(_) => {
                None
            }
        }
    }

    /// Whether this error invalidates the whole build rather than one path.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Pattern { .. } | Self::Runtime(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    #[test]
    fn test_path_attribution() {
        let err = IndexError::List {
            path: PathBuf::from("/src/locked"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.path(), Some(Path::new("/src/locked")));
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("failed to list /src/locked"));
    }

    #[test]
    fn test_pattern_error_is_fatal() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = IndexError::Pattern {
            pattern: "(".to_string(),
            source,
        };
        assert_eq!(err.path(), None);
        assert!(err.is_fatal());
    }
}
