//! Path predicates deciding what a walk descends into and tokenizes.

use std::path::Path;

use regex::Regex;

use crate::config::TokenizeOptions;
use crate::error::{IndexError, Result};

/// Compiled directory-exclude and file-include patterns.
///
/// Patterns are compiled once per build and shared read-only by every task.
/// An empty pattern disables its check.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    folder_exclude: Option<Regex>,
    file_include: Option<Regex>,
}

impl PathFilter {
    /// Compile the patterns from `options`.
    pub fn new(options: &TokenizeOptions) -> Result<Self> {
        Ok(Self {
            folder_exclude: compile(&options.folder_exclude_regex)?,
            file_include: compile(&options.file_include_regex)?,
        })
    }

    /// Whether a walk should list the directory at `dir`.
    pub fn should_descend(&self, dir: &Path) -> bool {
        self.folder_exclude
            .as_ref()
            .is_none_or(|re| !re.is_match(&dir.to_string_lossy()))
    }

    /// Whether the file at `file` should be tokenized.
    pub fn should_tokenize(&self, file: &Path) -> bool {
        self.file_include
            .as_ref()
            .is_none_or(|re| re.is_match(&file.to_string_lossy()))
    }
}

fn compile(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| IndexError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}
