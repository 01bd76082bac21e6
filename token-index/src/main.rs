use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use codex_token_index::{IndexBuilder, IndexReport, TokenizeOptions};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Build an inverted token index over a source tree.
#[derive(Debug, Parser)]
#[command(name = "codex-token-index", version)]
struct Cli {
    /// Root of the tree to index.
    root: PathBuf,

    /// Load options from a JSON file; flags below override its values.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip directories whose path matches this regex.
    #[arg(long, value_name = "REGEX")]
    exclude: Option<String>,

    /// Only tokenize files whose path matches this regex.
    #[arg(long, value_name = "REGEX")]
    include: Option<String>,

    /// Maximum number of entries doing I/O at once.
    #[arg(long, value_name = "N", conflicts_with = "unbounded")]
    max_concurrency: Option<usize>,

    /// Do not cap concurrent I/O.
    #[arg(long)]
    unbounded: bool,

    /// Follow symbolic links.
    #[arg(long)]
    follow_symlinks: bool,

    /// Do not list directories deeper than this.
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,

    /// Print the index as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> anyhow::Result<TokenizeOptions> {
        let mut options = match &self.config {
            Some(path) => TokenizeOptions::from_json_file(path)?,
            None => TokenizeOptions::default(),
        };
        if let Some(exclude) = &self.exclude {
            options = options.exclude_folders(exclude.as_str());
        }
        if let Some(include) = &self.include {
            options = options.include_files(include.as_str());
        }
        if let Some(limit) = self.max_concurrency {
            options = options.with_max_concurrency(limit);
        }
        if self.unbounded {
            options = options.unbounded();
        }
        if self.follow_symlinks {
            options = options.follow_symlinks();
        }
        if let Some(depth) = self.max_depth {
            options = options.with_max_depth(depth);
        }
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let builder = IndexBuilder::new(cli.options()?);

    let cancel = builder.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, returning partial index");
            cancel.cancel();
        }
    });

    let report = builder.build(&cli.root).await;
    print_report(&report, cli.json)?;

    let code = if report.cancelled {
        ExitCode::from(130)
    } else if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };
    Ok(code)
}

fn print_report(report: &IndexReport, json: bool) -> anyhow::Result<()> {
    for error in &report.errors {
        eprintln!("error: {error}");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report.index)?;
        writeln!(out)?;
    } else {
        for token in report.index.tokens() {
            let count = report.index.get(token).map_or(0, |paths| paths.len());
            writeln!(out, "{count:>6} {token}")?;
        }
        writeln!(
            out,
            "{} tokens, {} files indexed, {} skipped, {} directories ({} pruned), {}ms",
            report.index.len(),
            report.stats.files_indexed,
            report.stats.files_skipped,
            report.stats.directories_walked,
            report.stats.directories_pruned,
            report.stats.duration_ms
        )?;
    }
    Ok(())
}
