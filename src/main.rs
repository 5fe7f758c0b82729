//! CLI entry point for the harvester tool.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::pipeline::{Pipeline, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod exit;

use cli::Args;
use exit::ProcessExit;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ProcessExit::Failure.into()
        }
    }
}

/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > default (info).
fn init_tracing(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args) -> Result<ProcessExit> {
    debug!(?args, "CLI arguments parsed");

    let loaded = config::load_file_config(args.config.as_deref())?;
    if let Some((path, _)) = &loaded {
        info!(path = %path.display(), "loaded config file");
    }
    let file_config = loaded.as_ref().map(|(_, cfg)| cfg);

    let pipeline_config = config::resolve_pipeline_config(&args, file_config);
    let report_path = config::resolve_report_path(&args, file_config);
    let pipeline =
        Pipeline::with_http_client(pipeline_config).context("Failed to set up the download pipeline")?;

    if args.dry_run {
        let urls = pipeline.harvest_urls().await?;
        let mut stdout = io::stdout().lock();
        for url in &urls {
            writeln!(stdout, "{url}")?;
        }
        info!(urls = urls.len(), "dry run, nothing downloaded");
        return Ok(ProcessExit::Success);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight attempts");
            on_interrupt.cancel();
        }
    });

    info!("harvester starting");
    let summary = pipeline.run(&cancel).await?;

    if let Some(path) = report_path {
        write_report(&path, &summary)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(exit::exit_for_summary(&summary))
}

fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report '{}'", path.display()))
}
