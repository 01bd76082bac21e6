//! # Token Index
//!
//! This crate builds an inverted index over a source tree: for every file it
//! extracts identifier-like tokens and records which files contain each one.
//! It is the preprocessing pass behind Codex code search.
//!
//! ## Features
//!
//! - **Streaming Tokenizer**: Splits arbitrarily large files without buffering them
//! - **Parallel Walk**: One task per directory entry, merged bottom-up
//! - **Path Filters**: Regex-based directory exclusion and file inclusion
//! - **Bounded I/O**: A configurable cap on concurrent filesystem work
//! - **Cancellation**: Stop a build early and keep the partial index
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Token Index                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  TokenizeOptions ──► IndexBuilder ──► IndexReport               │
//! │       │                  │                 ▲                    │
//! │       ▼                  ▼                 │                    │
//! │   PathFilter        TreeWalker ──► merge(TokenIndex)            │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                       Tokens                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codex_token_index::{TokenizeOptions, build_index};
//!
//! let options = TokenizeOptions::new()
//!     .exclude_folders("node_modules|/\\.git$")
//!     .include_files(r"\.(rs|go)$");
//! let report = build_index("src", &options);
//! for error in &report.errors {
//!     eprintln!("{error}");
//! }
//! println!("{} tokens", report.index.len());
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod index;
pub mod report;
pub mod tokenizer;
mod walker;

pub use builder::{IndexBuilder, build_index};
pub use config::TokenizeOptions;
pub use error::{IndexError, Result};
pub use filter::PathFilter;
pub use index::{TokenIndex, merge};
pub use report::{IndexReport, IndexStats};
pub use tokenizer::{Token, Tokens, tokenize_bytes};

pub use tokio_util::sync::CancellationToken;
