//! Crate Digger - playlist downloader with multi-catalog metadata lookup.
//!
//! Downloads every track of a playlist through yt-dlp and ffmpeg, then asks
//! several music catalogs about each track (BPM, key, genre, label, ...)
//! and writes what they agree on into the file's tags.

pub mod cli;
pub mod config;
pub mod download;
pub mod enrichment;
pub mod error;
pub mod media;
pub mod metadata;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::Directive, fmt, prelude::*};

const DEFAULT_LOG_DIRECTIVE: &str = "crate_digger=info";

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so JSON reports on stdout stay parseable
    let default_directive: Directive = DEFAULT_LOG_DIRECTIVE.parse()?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(default_directive)
                .from_env_lossy(),
        )
        .init();

    cli::run_command(&args)
}
