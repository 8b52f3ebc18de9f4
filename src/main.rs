//! CLI entry point for the bulkdl archiver.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use bulkdl_core::config::load_config;
use bulkdl_core::source::ChainedSource;
use bulkdl_core::{
    DownloadFilter, Downloader, ExtensionDomainFilter, JsonLinesSource, SiteContext,
    SubmissionSource,
};
use tracing::{debug, info};

mod cli;
mod progress;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_config(args.config.as_deref())?;
    if loaded.loaded_from_file()
        && let Some(path) = loaded.path.as_deref()
    {
        info!(path = %path.display(), "Loaded config file");
    }

    let quiet = args.quiet;
    let plan = args.into_plan(loaded.into_config())?;

    if plan.inputs.is_empty() {
        info!("No listing provided. Pass one or more --input FILE.");
        info!("Example: bulkdl ./archive --input saved.jsonl");
        return Ok(());
    }

    // Every listing must be readable before anything is downloaded.
    let mut sources: Vec<Box<dyn SubmissionSource>> = Vec::with_capacity(plan.inputs.len());
    for input in &plan.inputs {
        let source = JsonLinesSource::open(input)
            .await
            .with_context(|| format!("Failed to open listing '{}'", input.display()))?;
        sources.push(Box::new(source));
    }

    let download_filter: Arc<dyn DownloadFilter> = Arc::new(ExtensionDomainFilter::new(
        &plan.skip_extensions,
        &plan.skip_domains,
    ));
    let context = SiteContext::new().context("Failed to build HTTP client")?;

    let spinner = progress::start_spinner(
        plan.settings.search_existing
            && progress::should_use_spinner(io::stderr().is_terminal(), quiet),
        "Hashing existing files",
    );
    let downloader = Downloader::new(
        plan.settings,
        download_filter,
        Box::new(plan.formatter),
        context,
    )
    .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let mut downloader = downloader.context("Failed to scan existing files")?;

    info!(
        output_dir = %downloader.output_dir().display(),
        listings = sources.len(),
        "bulkdl starting"
    );

    let mut source = ChainedSource::new(sources);
    let stats = downloader.run(&mut source).await;

    info!(
        submissions = stats.submissions,
        filtered = stats.filtered,
        no_strategy = stats.no_strategy,
        disabled = stats.disabled,
        extraction_failed = stats.extraction_failed,
        source_errors = stats.source_errors,
        written = stats.resources.written,
        linked = stats.resources.linked,
        skipped_existing = stats.resources.skipped_existing,
        duplicates = stats.resources.duplicates,
        failed = stats.resources.failed,
        "Download complete"
    );

    Ok(())
}
