//! Entry points that run a complete index build.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::TokenizeOptions;
use crate::error::IndexError;
use crate::filter::PathFilter;
use crate::report::IndexReport;
use crate::walker::TreeWalker;

/// Builds token indexes with one set of options.
///
/// The builder can be cancelled from another task or thread through its
/// [`CancellationToken`]; outstanding work then returns promptly with
/// whatever it had collected and the report is marked `cancelled`.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    options: TokenizeOptions,
    cancel: CancellationToken,
}

impl IndexBuilder {
    /// Create a builder for `options`.
    pub fn new(options: TokenizeOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels builds started by this builder.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The options this builder was created with.
    pub fn options(&self) -> &TokenizeOptions {
        &self.options
    }

    /// Index the tree rooted at `root`.
    ///
    /// Per-path failures never abort the build; they are returned alongside
    /// the partial index. An invalid pattern is reported before any I/O as the
    /// only error.
    pub async fn build(&self, root: impl AsRef<Path>) -> IndexReport {
        let root = root.as_ref();
        let start = Instant::now();

        let filter = match PathFilter::new(&self.options) {
            Ok(filter) => filter,
            Err(err) => {
                warn!("Not indexing {}: {err}", root.display());
                return IndexReport::failed(err);
            }
        };

        info!("Building token index for {}", root.display());
        let walker = Arc::new(TreeWalker::new(filter, &self.options, self.cancel.clone()));
        let mut report = walker.walk(root.to_path_buf(), 0).await;
        report.stats.duration_ms =
            u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            "Indexed {} tokens from {} files in {}ms (errors: {}, cancelled: {})",
            report.index.len(),
            report.stats.files_indexed,
            report.stats.duration_ms,
            report.errors.len(),
            report.cancelled
        );
        report
    }

    /// Index the tree rooted at `root` on a runtime owned by this call.
    ///
    /// Must not be called from within a tokio runtime; use [`Self::build`]
    /// there instead.
    pub fn build_blocking(&self, root: impl AsRef<Path>) -> IndexReport {
        match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.build(root)),
            Err(err) => IndexReport::failed(IndexError::Runtime(err)),
        }
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(TokenizeOptions::default())
    }
}

/// Index the tree rooted at `root`, blocking until the build finishes.
pub fn build_index(root: impl AsRef<Path>, options: &TokenizeOptions) -> IndexReport {
    IndexBuilder::new(options.clone()).build_blocking(root)
}
