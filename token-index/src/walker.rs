//! Recursive parallel traversal that builds a token index bottom-up.
//!
//! Every directory entry gets its own task. A directory task lists its
//! children, spawns one task per child into a `JoinSet`, and folds their
//! reports into its own as they finish. File tasks tokenize on the blocking
//! pool and hand back a single-file index. Reports only ever move upward by
//! value through the join handles, so no index is shared between tasks.
//!
//! A semaphore bounds how many entries touch the filesystem at once. A
//! directory gives its permit back before it waits on its children, so the
//! bound can never starve a deep tree.

use std::collections::HashMap;
use std::fs::{File, Metadata};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::TokenizeOptions;
use crate::error::IndexError;
use crate::filter::PathFilter;
use crate::report::IndexReport;
use crate::tokenizer::Tokens;

/// Held while an entry is doing filesystem I/O.
struct IoSlot {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Shared, read-only state for every task of one build.
pub(crate) struct TreeWalker {
    filter: PathFilter,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    follow_symlinks: bool,
    max_depth: Option<usize>,
    buffer_size: usize,
}

impl TreeWalker {
    pub(crate) fn new(
        filter: PathFilter,
        options: &TokenizeOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            filter,
            limiter: options
                .concurrency_limit()
                .map(|limit| Arc::new(Semaphore::new(limit))),
            cancel,
            follow_symlinks: options.follow_symlinks,
            max_depth: options.max_depth,
            buffer_size: options.buffer_size(),
        }
    }

    /// Index the entry at `path`, which sits `depth` levels below the root.
    pub(crate) fn walk(
        self: Arc<Self>,
        path: PathBuf,
        depth: usize,
    ) -> BoxFuture<'static, IndexReport> {
        async move { self.visit(path, depth).await }.boxed()
    }

    async fn visit(self: Arc<Self>, path: PathBuf, depth: usize) -> IndexReport {
        let Some(slot) = self.acquire().await else {
            return IndexReport::cancelled();
        };

        let metadata = match self.stat(&path, depth).await {
            Ok(metadata) => metadata,
            Err(source) => {
                return IndexReport::failed(logged(IndexError::Stat { path, source }));
            }
        };

        if metadata.is_dir() {
            let (children, mut report) = self.list(&path, depth).await;
            drop(slot);
            if !children.is_empty() {
                report = self.fan_out(&path, children, depth, report).await;
            }
            report
        } else if metadata.is_file() {
            self.tokenize(path, slot).await
        } else {
            debug!("Skipping {} (not a regular file or directory)", path.display());
            IndexReport::default()
        }
    }

    /// Wait for an I/O slot. `None` means the build was cancelled.
    async fn acquire(&self) -> Option<IoSlot> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let Some(limiter) = &self.limiter else {
            return Some(IoSlot { _permit: None });
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(limiter).acquire_owned() => {
                permit.ok().map(|permit| IoSlot { _permit: Some(permit) })
            }
        }
    }

    async fn stat(&self, path: &Path, depth: usize) -> std::io::Result<Metadata> {
        // The root is always resolved, even when it is a link.
        if self.follow_symlinks || depth == 0 {
            tokio::fs::metadata(path).await
        } else {
            tokio::fs::symlink_metadata(path).await
        }
    }

    /// List the children of `dir`, or explain why it was not listed.
    async fn list(&self, dir: &Path, depth: usize) -> (Vec<PathBuf>, IndexReport) {
        let mut report = IndexReport::default();

        if !self.filter.should_descend(dir) {
            debug!("Pruning excluded directory {}", dir.display());
            report.stats.directories_pruned = 1;
            return (Vec::new(), report);
        }
        if self.max_depth.is_some_and(|max| depth >= max) {
            debug!("Pruning {} at depth {depth}", dir.display());
            report.stats.directories_pruned = 1;
            return (Vec::new(), report);
        }

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(source) => {
                report.errors.push(logged(IndexError::List {
                    path: dir.to_path_buf(),
                    source,
                }));
                return (Vec::new(), report);
            }
        };

        report.stats.directories_walked = 1;
        let mut children = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => children.push(entry.path()),
                Ok(None) => break,
                Err(source) => {
                    // Keep whatever was listed before the failure.
                    report.errors.push(logged(IndexError::List {
                        path: dir.to_path_buf(),
                        source,
                    }));
                    break;
                }
            }
        }

        (children, report)
    }

    /// Spawn one task per child and wait for all of them.
    async fn fan_out(
        self: &Arc<Self>,
        dir: &Path,
        children: Vec<PathBuf>,
        depth: usize,
        mut report: IndexReport,
    ) -> IndexReport {
        let mut tasks = ChildTasks::default();
        for child in children {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let walk = Arc::clone(self).walk(child.clone(), depth + 1);
            tasks.spawn(child, walk);
        }

        tasks.join_into(dir, &mut report).await;
        report
    }

    async fn tokenize(&self, path: PathBuf, slot: IoSlot) -> IndexReport {
        if !self.filter.should_tokenize(&path) {
            debug!("Skipping file {}", path.display());
            let mut report = IndexReport::default();
            report.stats.files_skipped = 1;
            return report;
        }

        let cancel = self.cancel.clone();
        let buffer_size = self.buffer_size;
        let file_path = path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            tokenize_file(&file_path, buffer_size, &cancel)
        })
        .await;

        match joined {
            Ok(report) => report,
            Err(err) => IndexReport::failed(logged(IndexError::Task {
                path,
                message: err.to_string(),
            })),
        }
    }
}

/// The tasks spawned for one directory's children, keyed by task id so a
/// failed task is reported against the child it was walking.
#[derive(Default)]
struct ChildTasks {
    tasks: JoinSet<IndexReport>,
    paths: HashMap<task::Id, PathBuf>,
}

impl ChildTasks {
    fn spawn<F>(&mut self, path: PathBuf, walk: F)
    where
        F: Future<Output = IndexReport> + Send + 'static,
    {
        let handle = self.tasks.spawn(walk);
        self.paths.insert(handle.id(), path);
    }

    /// Wait for every child and fold its report into `report`.
    async fn join_into(mut self, dir: &Path, report: &mut IndexReport) {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            match joined {
                Ok((id, child)) => {
                    self.paths.remove(&id);
                    report.absorb(child);
                }
                Err(err) => {
                    let path = self
                        .paths
                        .remove(&err.id())
                        .unwrap_or_else(|| dir.to_path_buf());
                    report.errors.push(logged(IndexError::Task {
                        path,
                        message: err.to_string(),
                    }));
                }
            }
        }
    }
}

/// Build the single-file index for `path`.
///
/// Only a file read to the end without errors counts as indexed.
fn tokenize_file(path: &Path, buffer_size: usize, cancel: &CancellationToken) -> IndexReport {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(source) => {
            return IndexReport::failed(logged(IndexError::Open {
                path: path.to_path_buf(),
                source,
            }));
        }
    };

    let mut report = IndexReport::default();
    let mut tokens =
        Tokens::with_buffer_size(file, buffer_size).with_cancellation(cancel.clone());
    for token in tokens.by_ref() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match token {
            Ok(token) => {
                report.index.insert(token, path);
            }
            Err(source) => report.errors.push(logged(IndexError::Read {
                path: path.to_path_buf(),
                source,
            })),
        }
    }
    report.cancelled |= tokens.is_cancelled();
    if !report.cancelled && report.errors.is_empty() {
        report.stats.files_indexed = 1;
    }
    report
}

fn logged(error: IndexError) -> IndexError {
    warn!("{error}");
    error
}
