//! Media acquisition - turning playlist URLs into local audio files.
//!
//! The pipeline shells out to two external tools:
//! - **yt-dlp** (`ytdlp.rs`) enumerates playlists, resolves track references
//!   and downloads the best audio stream
//! - **ffmpeg** (`ffmpeg.rs`) converts the raw download into the target format
//!
//! Both sit behind the traits in `traits.rs` so the download orchestrator
//! can be tested without either tool installed.

pub mod ffmpeg;
pub mod files;
pub mod naming;
pub mod tools;
pub mod traits;
pub mod ytdlp;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use ffmpeg::Ffmpeg;
pub use traits::{Converter, MediaDownloader, MediaResolver};
pub use ytdlp::YtDlp;

/// A playlist member: a direct URL or a title/artist pair to search for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackRef {
    Url(String),
    Search { title: String, artist: Option<String> },
}

impl TrackRef {
    pub fn url(url: impl Into<String>) -> Self {
        TrackRef::Url(url.into().trim().to_string())
    }

    /// A search pair. A blank artist becomes a title-only search.
    pub fn search(title: impl Into<String>, artist: Option<&str>) -> Self {
        TrackRef::Search {
            title: title.into().trim().to_string(),
            artist: artist
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        }
    }

    /// Identity used for deduplication
    pub fn key(&self) -> String {
        match self {
            TrackRef::Url(url) => format!("url:{}", url),
            TrackRef::Search { title, artist } => format!(
                "search:{}|{}",
                artist.as_deref().unwrap_or_default().to_lowercase(),
                title.to_lowercase()
            ),
        }
    }

    /// Short stable id derived from the reference
    pub fn id(&self) -> String {
        short_hash(&self.key())
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRef::Url(url) => f.write_str(url),
            TrackRef::Search {
                title,
                artist: Some(artist),
            } => write!(f, "{} - {}", artist, title),
            TrackRef::Search {
                title,
                artist: None,
            } => f.write_str(title),
        }
    }
}

/// First 12 hex chars of the SHA-256 of `input`
pub fn short_hash(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Drop repeated references, keeping the first occurrence and the original order.
pub fn dedupe_refs(refs: Vec<TrackRef>) -> Vec<TrackRef> {
    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(r.key())).collect()
}

/// Everything needed to download a track, plus the best guess at what it is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    /// URL handed to the downloader
    pub download_ref: String,
    pub title: String,
    pub artist: Option<String>,
    /// Seconds, when the platform reports it
    pub duration_hint: Option<u32>,
}

/// Output audio format
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Flac,
    Wav,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors from resolving, downloading, converting or opening media.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Could not resolve {reference}: {message}")]
    Resolution { reference: String, message: String },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("{0} not found - is it installed and on PATH?")]
    ToolMissing(String),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn resolution(reference: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::Resolution {
            reference: reference.to_string(),
            message: message.into(),
        }
    }
}
