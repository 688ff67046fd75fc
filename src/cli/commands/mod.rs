//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `download`: Playlist and single-track downloads
//! - `search`: Metadata aggregation and provider diagnostics
//! - `tools`: External tool checks, file inspection and config setup

mod download;
mod search;
mod tools;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::download::DownloadOptions;
use crate::error::Error;
use crate::media::AudioFormat;

pub use download::{cmd_download, cmd_get};
pub use search::{SearchArgs, cmd_providers, cmd_search};
pub use tools::{cmd_check_tools, cmd_init_config, cmd_inspect};

/// Crate Digger CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GetSongBPM API key
    #[arg(long, global = true, env = "GETSONGBPM_API_KEY", hide_env_values = true)]
    pub getsongbpm_api_key: Option<String>,

    /// Last.fm API key
    #[arg(long, global = true, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    /// Discogs personal access token
    #[arg(long, global = true, env = "DISCOGS_TOKEN", hide_env_values = true)]
    pub discogs_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download every track of a playlist (or a single video URL)
    Download {
        /// Playlist or video URL
        url: String,
        #[command(flatten)]
        options: DownloadArgs,
    },
    /// Search for a track by title and artist and download it
    Get {
        /// Track title
        #[arg(long)]
        title: String,
        /// Artist name
        #[arg(long)]
        artist: Option<String>,
        #[command(flatten)]
        options: DownloadArgs,
    },
    /// Look up track metadata across all configured providers
    Search {
        /// Track title
        title: String,
        /// Artist name
        #[arg(short, long)]
        artist: Option<String>,
        /// Also query the slow scrape-based provider
        #[arg(long)]
        extended: bool,
        /// Local copy of the track, for tempo and key analysis
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which metadata providers are configured
    Providers {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that yt-dlp and ffmpeg are installed
    CheckTools {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show content type, size and tags of a local audio file
    Inspect {
        /// Path to the audio file
        path: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a config file with default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `download` and `get`
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Output audio format
    #[arg(short, long, value_enum)]
    pub format: Option<AudioFormat>,
    /// Skip the metadata lookup
    #[arg(long)]
    pub no_enhance: bool,
    /// Tracks processed at once
    #[arg(short = 'j', long)]
    pub max_concurrent: Option<usize>,
    /// Also query the slow scrape-based provider
    #[arg(long)]
    pub extended: bool,
    /// Directory for converted tracks
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

impl DownloadArgs {
    /// Config defaults with the flags given on the command line applied
    pub fn to_options(&self, config: &Config) -> DownloadOptions {
        let mut options = DownloadOptions::from_config(config);
        if let Some(format) = self.format {
            options.format = format;
        }
        if self.no_enhance {
            options.enhance_metadata = false;
        }
        if let Some(max) = self.max_concurrent {
            options.max_concurrent = max;
        }
        if self.extended {
            options.use_extended_provider = true;
        }
        if let Some(ref dir) = self.output {
            options.download_dir = dir.clone();
        }
        options
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli);
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Download { url, options } => cmd_download(&rt, &config, url, options),
        Commands::Get {
            title,
            artist,
            options,
        } => cmd_get(&rt, &config, title, artist.as_deref(), options),
        Commands::Search {
            title,
            artist,
            extended,
            file,
            json,
        } => cmd_search(
            &rt,
            &config,
            SearchArgs {
                title,
                artist: artist.as_deref(),
                file: file.as_deref(),
                extended: *extended,
                json: *json,
            },
        ),
        Commands::Providers { json } => cmd_providers(&config, *json),
        Commands::CheckTools { json } => cmd_check_tools(&rt, &config, *json),
        Commands::Inspect { path, json } => cmd_inspect(&rt, path, *json),
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), *force),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config file and apply credentials from flags or the environment
fn load_config(cli: &Cli) -> Config {
    let mut config = match cli.config {
        Some(ref path) => config::load_from(path),
        None => config::load(),
    };
    apply_credentials(&mut config, cli);
    config
}

fn apply_credentials(config: &mut Config, cli: &Cli) {
    let credentials = &mut config.credentials;
    if let Some(ref key) = cli.getsongbpm_api_key {
        credentials.getsongbpm_api_key = Some(key.clone());
    }
    if let Some(ref key) = cli.lastfm_api_key {
        credentials.lastfm_api_key = Some(key.clone());
    }
    if let Some(ref token) = cli.discogs_token {
        credentials.discogs_token = Some(token.clone());
    }
}

/// Convert a library error for display, pointing bad input at `--help`
pub(crate) fn cli_error(command: &str, error: Error) -> anyhow::Error {
    if error.is_validation() {
        anyhow::anyhow!("{}\nRun `crate-digger {} --help` for usage.", error, command)
    } else {
        error.into()
    }
}

/// Pretty-print a report to stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
