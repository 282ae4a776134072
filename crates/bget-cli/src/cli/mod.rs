//! CLI for the bget batch downloader.

mod confirm;
mod table;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use bget_core::config;
use bget_core::job::{self, JobParseOutcome};
use bget_core::progress::BatchProgress;
use bget_core::runner::{BatchRunner, BatchSettings};
use bget_core::speed_limit;

/// Rows beyond this go to a report file instead of the terminal.
const INVALID_ROWS_PRINT_LIMIT: usize = 100;

/// Batch file downloader: bounded concurrency, one aggregate bandwidth
/// ceiling, duplicate URLs fanned out to multiple destination files.
#[derive(Debug, Parser)]
#[command(name = "bget")]
#[command(about = "bget: concurrent batch file downloader", long_about = None)]
pub struct Cli {
    /// Number of concurrent download workers.
    #[arg(short = 'n', long = "threads")]
    pub threads: NonZeroUsize,

    /// Path to the file with `<url> <file name>` rows.
    #[arg(short = 'f', long = "links-file")]
    pub links_file: PathBuf,

    /// Directory downloaded files are written into (created if missing).
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,

    /// Aggregate speed limit for all workers, e.g. "500k" or "2m".
    #[arg(short = 'l', long = "speed-limit")]
    pub speed_limit: String,

    /// Ask whether to continue when the links file has malformed rows
    /// (without this flag malformed rows abort the run).
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,
}

pub async fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);

    let speed_limit = speed_limit::parse_speed_limit(&cli.speed_limit)?;
    validate_links_file(&cli.links_file)?;
    prepare_output_dir(&cli.output_dir)?;

    println!("Processing links file");
    let links_file = cli.links_file.clone();
    let parsed = tokio::task::spawn_blocking(move || job::load_jobs(&links_file))
        .await
        .context("links file parse join")??;

    if !confirm_invalid_rows(&cli, &parsed).await? {
        println!("Aborted.");
        return Ok(());
    }

    let settings = BatchSettings {
        workers: cli.threads.get(),
        out_dir: cli.output_dir.clone(),
        speed_limit,
    };
    let runner = BatchRunner::new(settings, &cfg).await?;

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<BatchProgress>(16);
    let printer = tokio::spawn(async move {
        use std::io::Write;
        while let Some(progress) = progress_rx.recv().await {
            print!(
                "\r{} / {} downloads completed",
                progress.completed, progress.total
            );
            let _ = std::io::stdout().flush();
        }
        println!();
    });

    println!("Starting downloading");
    let results = runner.run(parsed.jobs, Some(progress_tx)).await?;
    let _ = printer.await;

    println!("Downloading finished");
    print!("{}", table::render(&results));
    Ok(())
}

fn validate_links_file(path: &Path) -> Result<()> {
    let meta = match path.metadata() {
        Ok(meta) => meta,
        Err(err) => bail!("links file {} is not readable: {}", path.display(), err),
    };
    if meta.is_dir() {
        bail!("links file {} is a directory", path.display());
    }
    Ok(())
}

fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("output path {} is not a directory", path.display());
        }
        return Ok(());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("creating output directory {}", path.display()))?;
    Ok(())
}

/// Resolves the malformed-rows decision point before the batch starts.
/// Returns false when the user declines to continue.
async fn confirm_invalid_rows(cli: &Cli, parsed: &JobParseOutcome) -> Result<bool> {
    if parsed.invalid_rows.is_empty() {
        return Ok(true);
    }
    if !cli.interactive {
        bail!(
            "invalid links file {}: invalid format at rows {:?} (expected <HTTP link><space><file name>)",
            cli.links_file.display(),
            parsed.invalid_rows
        );
    }

    if parsed.invalid_rows.len() > INVALID_ROWS_PRINT_LIMIT {
        match write_invalid_rows_report(&parsed.invalid_rows) {
            Ok(report) => println!(
                "{} invalid rows detected; row numbers saved to {}",
                parsed.invalid_rows.len(),
                report.display()
            ),
            Err(err) => {
                tracing::debug!("could not write invalid-rows report: {}", err);
                println!("Invalid format at rows {:?}", parsed.invalid_rows);
            }
        }
    } else {
        println!("Invalid format at rows {:?}", parsed.invalid_rows);
    }
    println!(
        "{} of {} rows will be processed",
        parsed.row_count - parsed.invalid_rows.len(),
        parsed.row_count
    );
    confirm::yes_no("Continue processing?").await
}

fn write_invalid_rows_report(rows: &[usize]) -> Result<PathBuf> {
    let path = xdg::BaseDirectories::with_prefix("bget")?.place_state_file("invalid-rows-report")?;
    let contents = rows
        .iter()
        .map(|row| row.to_string())
        .collect::<Vec<_>>()
        .join(",");
    std::fs::write(&path, contents)?;
    Ok(path)
}
