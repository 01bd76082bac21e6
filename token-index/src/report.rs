//! Results handed from walk tasks to their parents and finally to the caller.

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::index::TokenIndex;

/// Outcome of indexing one subtree: a best-effort index plus every error hit
/// along the way.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// The index built from every readable, included file.
    pub index: TokenIndex,

    /// Per-path errors, or a single fatal error.
    pub errors: Vec<IndexError>,

    /// Whether the build was cancelled before it finished.
    pub cancelled: bool,

    /// Counters for the subtree.
    pub stats: IndexStats,
}

impl IndexReport {
    /// A report holding only `error`.
    pub fn failed(error: IndexError) -> Self {
        Self {
            errors: vec![error],
            ..Self::default()
        }
    }

    /// An empty report marked as cancelled.
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    /// Fold a child's report into this one.
    pub fn absorb(&mut self, child: IndexReport) {
        self.index.merge_from(child.index);
        self.errors.extend(child.errors);
        self.cancelled |= child.cancelled;
        self.stats.add(&child.stats);
    }

    /// Whether the build ran to completion without errors.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Split into the index and its error list.
    pub fn into_parts(self) -> (TokenIndex, Vec<IndexError>) {
        (self.index, self.errors)
    }
}

/// Counters collected during a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files read to the end without errors or cancellation.
    pub files_indexed: usize,

    /// Files skipped by the include pattern.
    pub files_skipped: usize,

    /// Directories that were listed.
    pub directories_walked: usize,

    /// Directories pruned by the exclude pattern or the depth limit.
    pub directories_pruned: usize,

    /// Wall-clock time of the whole build in milliseconds.
    pub duration_ms: u64,
}

impl IndexStats {
    fn add(&mut self, other: &IndexStats) {
        self.files_indexed += other.files_indexed;
        self.files_skipped += other.files_skipped;
        self.directories_walked += other.directories_walked;
        self.directories_pruned += other.directories_pruned;
    }
}
