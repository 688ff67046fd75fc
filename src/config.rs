//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\crate-digger\config.toml
//! - macOS: ~/Library/Application Support/crate-digger/config.toml
//! - Linux: ~/.config/crate-digger/config.toml
//!
//! The config file is human-readable and editable. Credentials can also be
//! supplied through environment variables or CLI flags, which win over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::enrichment::domain::ProviderId;
use crate::media::AudioFormat;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Playlist download defaults
    pub download: DownloadConfig,

    /// Metadata aggregation settings
    pub enrichment: EnrichmentConfig,

    /// External tool locations
    pub tools: ToolsConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// GetSongBPM API key (https://getsongbpm.com/api)
    pub getsongbpm_api_key: Option<String>,

    /// Last.fm API key
    pub lastfm_api_key: Option<String>,

    /// Discogs personal access token
    pub discogs_token: Option<String>,
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Where converted tracks are written
    pub directory: PathBuf,

    /// Output audio format
    pub format: AudioFormat,

    /// Maximum number of tracks processed at once
    pub max_concurrent: usize,

    /// Look up metadata for each track after conversion
    pub enhance_metadata: bool,

    /// Write merged metadata into the converted file's tags
    pub write_tags: bool,

    /// Per-track limit covering resolve, download, convert and enrich
    pub item_timeout_secs: Option<u64>,

    /// Whole-job deadline; tracks not started by then are failed
    pub job_timeout_secs: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
            format: AudioFormat::Mp3,
            max_concurrent: 3,
            enhance_metadata: true,
            write_tags: true,
            item_timeout_secs: Some(600),
            job_timeout_secs: None,
        }
    }
}

/// Metadata aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Also query the slow scrape-based provider
    pub use_extended_provider: bool,

    /// Timeout for each regular provider call
    pub provider_timeout_secs: u64,

    /// Timeout for the extended provider
    pub extended_timeout_secs: u64,

    /// Merge order: earlier providers win field conflicts
    pub priority: Vec<ProviderId>,

    /// Measure tempo and key from the downloaded file when catalogs don't know them
    pub analyze_audio: bool,

    /// How much of each file the analysis decodes
    pub analysis_max_secs: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            use_extended_provider: false,
            provider_timeout_secs: 8,
            extended_timeout_secs: 20,
            priority: ProviderId::ALL.to_vec(),
            analyze_audio: true,
            analysis_max_secs: 300,
        }
    }
}

/// External tool locations (bare names are looked up on PATH)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ytdlp_path: PathBuf,
    pub ffmpeg_path: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::audio_dir()
        .map(|d| d.join("crate-digger"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("crate-digger"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from an explicit path, with the same fallbacks as [`load`]
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
