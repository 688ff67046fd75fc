//! Local audio analysis
//!
//! Measures tempo and key from the downloaded file itself. No network and no
//! credentials, so it runs last in the priority list and only fills what the
//! catalogs left empty. Queries without a local file get no match.

mod decode;
mod key;
mod spectrum;
mod tempo;

use std::path::Path;

pub use decode::{MonoAudio, decode_mono};
pub use key::estimate_key;
pub use tempo::estimate_bpm;

use crate::enrichment::domain::{PartialMetadata, ProviderError, TrackQuery};

/// Signals quieter than this are treated as silence
const SILENCE_RMS: f32 = 1e-4;

/// Tempo and key detector over decoded audio
pub struct AudioAnalyzer {
    enabled: bool,
    max_seconds: u32,
}

impl AudioAnalyzer {
    /// `max_seconds` caps how much of each file is decoded.
    pub fn new(enabled: bool, max_seconds: u32) -> Self {
        Self {
            enabled,
            max_seconds: max_seconds.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Analyze the query's file on the blocking pool
    pub async fn analyze(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let Some(path) = query.file.clone() else {
            return Err(ProviderError::NoMatches);
        };
        let max_seconds = self.max_seconds;

        tokio::task::spawn_blocking(move || analyze_file(&path, max_seconds))
            .await
            .map_err(|e| ProviderError::Analysis(e.to_string()))?
    }
}

impl Default for AudioAnalyzer {
    fn default() -> Self {
        Self::new(true, 300)
    }
}

/// Decode `path` and estimate its tempo and key.
pub fn analyze_file(path: &Path, max_seconds: u32) -> Result<PartialMetadata, ProviderError> {
    let audio = decode_mono(path, max_seconds)?;
    if audio.rms() < SILENCE_RMS {
        tracing::debug!("{} is silent, nothing to analyze", path.display());
        return Err(ProviderError::NoMatches);
    }

    let partial = PartialMetadata {
        bpm: estimate_bpm(&audio)?,
        key: estimate_key(&audio)?,
        ..Default::default()
    };
    tracing::debug!(
        "Analyzed {}: bpm {:?}, key {:?}",
        path.display(),
        partial.bpm,
        partial.key
    );

    if partial.is_empty() {
        return Err(ProviderError::NoMatches);
    }
    Ok(partial)
}
