//! chunkline command-line uploader.

mod app;
mod args;
mod config;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chunkline_uploader::UploaderConfig;

use crate::args::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();

    let path = match args.config {
        Some(path) => path,
        None => config::config_path(),
    };
    let config = UploaderConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.endpoint,
        chunk_size = config.chunk_size,
        "starting upload"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(app::run(config, args.files))?;
    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        aborted = summary.aborted,
        "uploads finished"
    );

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
