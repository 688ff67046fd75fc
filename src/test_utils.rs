//! Test utilities and fixtures for crate-digger tests.
//!
//! This module provides mock media collaborators and small file fixtures so
//! the download pipeline can be exercised without yt-dlp, ffmpeg or network.
//!
//! # Example
//!
//! ```ignore
//! use crate_digger::test_utils::{MockResolver, MockDownloader, MockConverter};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let resolver = MockResolver::with_tracks(5).failing_on(2);
//!     let downloader = MockDownloader::with_random_delay(5, 20);
//!     // ... test logic
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::media::{
    AudioFormat, Converter, MediaDownloader, MediaError, MediaResolver, ResolvedTrack, TrackRef,
    dedupe_refs, short_hash,
};

/// URL of the `index`th synthetic track
pub fn track_url(index: usize) -> String {
    format!("https://example.com/watch?v=track{}", index)
}

/// Write a one-second silent 16-bit mono WAV file.
pub fn write_silent_wav(path: &Path) {
    write_wav(path, 8000, &[0.0; 8000]);
}

/// Write 16-bit mono PCM samples (clamped to -1.0..=1.0) as a WAV file.
pub fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
    let data_len = (samples.len() * 2) as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    std::fs::write(path, bytes).expect("Failed to write WAV fixture");
}

/// A metronome: short decaying 1 kHz clicks at `bpm` for `seconds`.
pub fn click_track(sample_rate: u32, bpm: f64, seconds: f64) -> Vec<f32> {
    let total = (sample_rate as f64 * seconds) as usize;
    let period = sample_rate as f64 * 60.0 / bpm;
    let click_len = sample_rate as usize / 100; // 10 ms

    let mut samples = vec![0.0f32; total];
    let mut beat = 0.0f64;
    while (beat as usize) < total {
        let start = beat as usize;
        for (i, sample) in samples[start..].iter_mut().take(click_len).enumerate() {
            let t = i as f32 / sample_rate as f32;
            let envelope = 1.0 - i as f32 / click_len as f32;
            *sample = 0.8 * envelope * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        }
        beat += period;
    }
    samples
}

/// Sustained sine tones, one per `(midi note, amplitude)` pair, summed.
pub fn chord(sample_rate: u32, notes: &[(u8, f32)], seconds: f64) -> Vec<f32> {
    let total = (sample_rate as f64 * seconds) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            notes
                .iter()
                .map(|&(note, amplitude)| {
                    let freq = 440.0 * 2f32.powf((note as f32 - 69.0) / 12.0);
                    amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
                })
                .sum()
        })
        .collect()
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolver over a fixed playlist, failing on chosen members.
pub struct MockResolver {
    refs: Vec<TrackRef>,
    failing: HashSet<String>,
    fail_enumeration: bool,
    resolve_delay: Duration,
}

impl MockResolver {
    /// A playlist of `count` synthetic URLs
    pub fn with_tracks(count: usize) -> Self {
        Self::with_refs((0..count).map(|i| TrackRef::url(track_url(i))).collect())
    }

    pub fn with_refs(refs: Vec<TrackRef>) -> Self {
        Self {
            refs,
            failing: HashSet::new(),
            fail_enumeration: false,
            resolve_delay: Duration::ZERO,
        }
    }

    /// A resolver whose playlist lookup fails
    pub fn failing_enumeration() -> Self {
        Self {
            fail_enumeration: true,
            ..Self::with_tracks(0)
        }
    }

    /// Fail resolution of the synthetic track at `index`
    pub fn failing_on(mut self, index: usize) -> Self {
        self.failing.insert(TrackRef::url(track_url(index)).key());
        self
    }

    /// Delay every resolution
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }
}

#[async_trait]
impl MediaResolver for MockResolver {
    async fn enumerate(&self, url: &str) -> Result<Vec<TrackRef>, MediaError> {
        if self.fail_enumeration {
            return Err(MediaError::resolution(url, "playlist unavailable"));
        }
        Ok(dedupe_refs(self.refs.clone()))
    }

    async fn resolve(&self, reference: &TrackRef) -> Result<ResolvedTrack, MediaError> {
        if !self.resolve_delay.is_zero() {
            tokio::time::sleep(self.resolve_delay).await;
        }
        if self.failing.contains(&reference.key()) {
            return Err(MediaError::resolution(reference, "video unavailable"));
        }

        let (title, artist) = match reference {
            TrackRef::Url(url) => {
                let n = url.rsplit("track").next().unwrap_or_default();
                (format!("Track {}", n), Some("Mock Artist".to_string()))
            }
            TrackRef::Search { title, artist } => (title.clone(), artist.clone()),
        };

        Ok(ResolvedTrack {
            download_ref: reference.to_string(),
            title,
            artist,
            duration_hint: Some(180),
        })
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// Downloader that writes a small file after a random delay, and records
/// how many downloads ran at once.
pub struct MockDownloader {
    min_delay_ms: u64,
    max_delay_ms: u64,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl MockDownloader {
    pub fn instant() -> Self {
        Self::with_random_delay(0, 0)
    }

    pub fn with_random_delay(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms: max_delay_ms.max(min_delay_ms),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Most downloads ever running at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDownloader for MockDownloader {
    async fn download(&self, track: &ResolvedTrack, dir: &Path) -> Result<PathBuf, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay_ms = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let path = dir.join(format!("raw-{}.webm", short_hash(&track.download_ref)));
        let result = tokio::fs::write(&path, b"raw audio")
            .await
            .map(|_| path)
            .map_err(MediaError::from);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Converter that copies bytes, writes a real WAV, or fails.
pub struct MockConverter {
    mode: ConvertMode,
    delay: Duration,
}

enum ConvertMode {
    Copy,
    SilentWav,
    Fail,
}

impl MockConverter {
    /// Copy the raw file to the target (not real audio, so tagging fails)
    pub fn copying() -> Self {
        Self {
            mode: ConvertMode::Copy,
            delay: Duration::ZERO,
        }
    }

    /// Write a valid silent WAV to the target
    pub fn writing_wav() -> Self {
        Self {
            mode: ConvertMode::SilentWav,
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: ConvertMode::Fail,
            delay: Duration::ZERO,
        }
    }

    /// Stall after writing the target, like an encoder still running
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Converter for MockConverter {
    async fn convert(
        &self,
        input: &Path,
        _format: AudioFormat,
        target: &Path,
    ) -> Result<PathBuf, MediaError> {
        match self.mode {
            ConvertMode::Copy => {
                tokio::fs::copy(input, target).await?;
            }
            ConvertMode::SilentWav => write_silent_wav(target),
            ConvertMode::Fail => {
                return Err(MediaError::Conversion("unsupported codec".to_string()));
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(target.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_resolver_fails_chosen_track() {
        let resolver = MockResolver::with_tracks(3).failing_on(1);
        let refs = resolver.enumerate("playlist").await.unwrap();
        assert_eq!(refs.len(), 3);

        assert!(resolver.resolve(&refs[0]).await.is_ok());
        assert!(matches!(
            resolver.resolve(&refs[1]).await,
            Err(MediaError::Resolution { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_resolver_titles() {
        let resolver = MockResolver::with_tracks(1);
        let resolved = resolver
            .resolve(&TrackRef::url(track_url(0)))
            .await
            .unwrap();
        assert_eq!(resolved.title, "Track 0");
    }

    #[tokio::test]
    async fn test_mock_downloader_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MockDownloader::instant();
        let track = ResolvedTrack {
            download_ref: track_url(0),
            title: "Track 0".to_string(),
            artist: None,
            duration_hint: None,
        };

        let path = downloader.download(&track, dir.path()).await.unwrap();
        assert!(path.exists());
        assert_eq!(downloader.peak(), 1);
    }

    #[test]
    fn test_silent_wav_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_silent_wav(&path);

        let tags = crate::metadata::read(&path).unwrap();
        assert_eq!(tags.duration, 1);
    }
}
