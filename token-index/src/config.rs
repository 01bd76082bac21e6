//! Configuration types for building a token index.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cap on entries doing filesystem I/O at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// Default size of each read fed to the tokenizer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Options controlling which parts of a tree get tokenized and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizeOptions {
    /// Directories whose path matches this regex are pruned ("" = exclude nothing).
    pub folder_exclude_regex: String,

    /// Only files whose path matches this regex are tokenized ("" = include everything).
    pub file_include_regex: String,

    /// Maximum number of entries doing I/O at once (None = unbounded).
    pub max_concurrency: Option<usize>,

    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,

    /// Maximum depth to recurse, the root being depth 0 (None = unlimited).
    pub max_depth: Option<usize>,

    /// Size of each read chunk in bytes.
    pub read_buffer_size: usize,
}

impl TokenizeOptions {
    /// Create options that include every file and exclude no directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory exclusion pattern.
    pub fn exclude_folders(mut self, pattern: impl Into<String>) -> Self {
        self.folder_exclude_regex = pattern.into();
        self
    }

    /// Set the file inclusion pattern.
    pub fn include_files(mut self, pattern: impl Into<String>) -> Self {
        self.file_include_regex = pattern.into();
        self
    }

    /// Cap the number of concurrent filesystem operations.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Remove the concurrency cap.
    pub fn unbounded(mut self) -> Self {
        self.max_concurrency = None;
        self
    }

    /// Enable following symbolic links.
    pub fn follow_symlinks(mut self) -> Self {
        self.follow_symlinks = true;
        self
    }

    /// Set the maximum depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the read chunk size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// The effective concurrency limit, never zero when set.
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.max_concurrency.map(|limit| limit.max(1))
    }

    /// The effective read chunk size, never zero.
    pub fn buffer_size(&self) -> usize {
        self.read_buffer_size.max(1)
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            folder_exclude_regex: String::new(),
            file_include_regex: String::new(),
            max_concurrency: Some(DEFAULT_MAX_CONCURRENCY),
            follow_symlinks: false,
            max_depth: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}
