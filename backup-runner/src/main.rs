//! Backup Runner - Main entry point
//!
//! Runs one or more named backup jobs from a JSON job catalog, once, in order.

use anyhow::Result;
use backup_runner::{utils, Catalog, Config, Pipeline};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated job names, e.g. `db,web`
    jobs: String,

    /// Job catalog (defaults to the configured catalog, `library.json`)
    catalog: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Split the job argument literally on `,`; empty names are kept and fail lookup.
fn split_jobs(arg: &str) -> Vec<String> {
    arg.split(',').map(str::to_string).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting backup-runner v{}", env!("CARGO_PKG_VERSION"));

    let names = split_jobs(&args.jobs);
    if names.len() > 1 {
        tracing::info!("Multiple items passed");
    }

    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog.path.clone());
    let catalog = Catalog::from_file(&catalog_path)?;
    tracing::debug!("Loaded {} job(s) from {}", catalog.len(), catalog_path.display());

    let pipeline = Pipeline::new(config.scratch_root());
    tracing::debug!("Scratch root: {}", pipeline.scratch().display());

    let summary = pipeline.run(&catalog, &names).await;

    for report in &summary.succeeded {
        tracing::info!("Backup '{}' written to {}", report.name, report.artifact.display());
    }

    if !summary.is_success() {
        anyhow::bail!("{} backup(s) failed", summary.failure_count());
    }

    Ok(())
}
