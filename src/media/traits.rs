//! Trait definitions for the media collaborators.
//!
//! Production code uses yt-dlp and ffmpeg; tests substitute the mocks in
//! `test_utils`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{AudioFormat, MediaError, ResolvedTrack, TrackRef};

/// Turns URLs and search pairs into downloadable tracks.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Ordered, deduplicated members of a playlist. A single-track URL
    /// enumerates to itself.
    async fn enumerate(&self, url: &str) -> Result<Vec<TrackRef>, MediaError>;

    /// Fetch track info for one reference.
    async fn resolve(&self, reference: &TrackRef) -> Result<ResolvedTrack, MediaError>;
}

/// Fetches the raw audio for a resolved track.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download into `dir`, returning the path of the raw file.
    async fn download(&self, track: &ResolvedTrack, dir: &Path) -> Result<PathBuf, MediaError>;
}

/// Converts a raw download into the requested format.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Write `input` as `format` to `target`, returning the written path.
    async fn convert(
        &self,
        input: &Path,
        format: AudioFormat,
        target: &Path,
    ) -> Result<PathBuf, MediaError>;
}
