//! wellform-fv - Format Verification CLI
//!
//! Identifies each input file's format, runs the applicable analyzers,
//! reconciles their metadata and prints one JSON report per file. Exit code
//! is nonzero when any file fails verification or cannot be reconciled.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use wellform_fv::analyzers::default_analyzers;
use wellform_fv::config::FvConfig;
use wellform_fv::Reconciler;

/// Format verification for digital preservation
#[derive(Debug, Parser)]
#[command(name = "wellform-fv", version, about)]
struct Cli {
    /// Files or directories to verify (directories are walked recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Run full verification (enables the structural analyzers)
    #[arg(long)]
    full: bool,

    /// Config file path
    #[arg(long, env = "WELLFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = FvConfig::load(cli.config.as_deref())?;
    let full_check = cli.full || config.full_check;
    let pretty = cli.pretty || config.pretty;

    info!("Starting wellform-fv");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let reconciler = Reconciler::with_tolerated(default_analyzers(), config.tolerated_values());

    let files = collect_files(&cli.paths);
    info!(count = files.len(), full_check = full_check, "Verifying files");

    let mut reports = Vec::new();
    let mut failures = 0usize;

    for path in &files {
        match reconciler.scan_file(path, full_check).await {
            Ok(report) => {
                if !report.is_sound() {
                    failures += 1;
                }
                info!("{}", report.summary());
                reports.push(report);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Scan failed");
                failures += 1;
            }
        }
    }

    let json = if pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{json}");

    if failures > 0 {
        info!(failures = failures, "Verification finished with failures");
        std::process::exit(1);
    }
    Ok(())
}

/// Expand the argument list: files stay, directories are walked
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        files.push(entry.path().to_path_buf());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Error walking {}: {e}", path.display());
                    }
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}
