//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// chunkline - upload files in chunks to a multipart HTTP endpoint.
#[derive(Debug, Parser)]
#[command(name = "chunkline", version, about)]
pub struct Cli {
    /// Config file (defaults to the per-user uploader.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Files to upload, in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}
