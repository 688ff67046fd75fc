//! Internal domain models for metadata aggregation.
//!
//! These types are OUR types - they don't change when external APIs change.
//! Every provider response gets converted into a [`PartialMetadata`] by that
//! provider's adapter, and the aggregator folds those into one [`Metadata`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifier of an external metadata catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Tempo/key catalog
    GetSongBpm,
    /// Label/release discography
    Discogs,
    /// Scrape-based store catalog (the slow "extended" provider)
    Beatport,
    /// Open recording database
    MusicBrainz,
    /// Listener tag catalog
    LastFm,
    /// Tempo and key measured from the downloaded audio itself
    Analysis,
}

impl ProviderId {
    /// Every known provider, in default priority order.
    pub const ALL: [ProviderId; 6] = [
        ProviderId::GetSongBpm,
        ProviderId::Discogs,
        ProviderId::Beatport,
        ProviderId::MusicBrainz,
        ProviderId::LastFm,
        ProviderId::Analysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::GetSongBpm => "getsongbpm",
            ProviderId::Discogs => "discogs",
            ProviderId::Beatport => "beatport",
            ProviderId::MusicBrainz => "musicbrainz",
            ProviderId::LastFm => "lastfm",
            ProviderId::Analysis => "analysis",
        }
    }

    /// Whether this is the slow, scrape-based provider gated by
    /// [`SearchOptions::use_extended_provider`].
    pub fn is_extended(self) -> bool {
        matches!(self, ProviderId::Beatport)
    }

    /// Whether calls get the longer extended timeout: the scraped catalog
    /// and local decoding both take more than a JSON round trip.
    pub fn is_slow(self) -> bool {
        matches!(self, ProviderId::Beatport | ProviderId::Analysis)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{}'", s))
    }
}

/// A validated metadata query.
///
/// The title is required; an empty artist is normalized to `None` and
/// providers fall back to a title-only lookup. `file` points at the local
/// audio when there is one, for providers that listen rather than search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub title: String,
    pub artist: Option<String>,
    pub file: Option<PathBuf>,
}

impl TrackQuery {
    /// Build a query, rejecting a blank title.
    pub fn new(title: &str, artist: &str) -> Result<Self, EnrichmentError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EnrichmentError::Validation("title is required".to_string()));
        }
        let artist = artist.trim();
        Ok(Self {
            title: title.to_string(),
            artist: (!artist.is_empty()).then(|| artist.to_string()),
            file: None,
        })
    }

    /// Attach the local audio file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Artist name for display, or "unknown" for title-only queries.
    pub fn artist_or_unknown(&self) -> &str {
        self.artist.as_deref().unwrap_or("unknown")
    }
}

/// Per-call options for metadata aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Include the slower, higher-fidelity extended provider
    pub use_extended_provider: bool,
}

/// Fields obtained from a single provider. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub label: Option<String>,
    /// Beats per minute
    pub bpm: Option<f64>,
    /// Musical key, normalized ("F Minor")
    pub key: Option<String>,
    /// Duration in seconds
    pub duration: Option<u32>,
    /// Free-text release/publish date (distinct from `year`)
    pub published_date: Option<String>,
}

impl PartialMetadata {
    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Number of usable (non-blank, valid) fields.
    pub fn field_count(&self) -> usize {
        [
            text(&self.title).is_some(),
            text(&self.artist).is_some(),
            text(&self.album).is_some(),
            self.year.is_some(),
            text(&self.genre).is_some(),
            text(&self.label).is_some(),
            self.bpm.filter(|b| valid_bpm(*b)).is_some(),
            text(&self.key).is_some(),
            self.duration.filter(|d| *d > 0).is_some(),
            text(&self.published_date).is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// The merged metadata record returned by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub duration: Option<u32>,
    pub published_date: Option<String>,
    /// Providers that supplied at least one non-empty field, in merge order
    pub sources: SmallVec<[ProviderId; 6]>,
}

impl Metadata {
    /// Merge a provider's partial record into this one.
    ///
    /// Fields already set are kept; only empty fields are filled. The
    /// provider is recorded in `sources` if it offered any usable field,
    /// even when every one of them lost to an earlier provider.
    /// Returns whether the provider counted as a contributor.
    pub fn merge(&mut self, source: ProviderId, other: &PartialMetadata) -> bool {
        if other.is_empty() {
            return false;
        }

        fill_text(&mut self.title, &other.title);
        fill_text(&mut self.artist, &other.artist);
        fill_text(&mut self.album, &other.album);
        if self.year.is_none() {
            self.year = other.year;
        }
        fill_text(&mut self.genre, &other.genre);
        fill_text(&mut self.label, &other.label);
        if self.bpm.is_none() {
            self.bpm = other.bpm.filter(|b| valid_bpm(*b));
        }
        fill_text(&mut self.key, &other.key);
        if self.duration.is_none() {
            self.duration = other.duration.filter(|d| *d > 0);
        }
        fill_text(&mut self.published_date, &other.published_date);

        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        true
    }

    /// Whether any provider contributed to this record.
    pub fn has_contributions(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Outcome of one provider call, as seen by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult {
    /// At least one usable field
    Success(PartialMetadata),
    /// The catalog had nothing usable for this query
    Empty,
    /// Transport, authentication or parsing failure
    Failure(ProviderError),
}

impl From<Result<PartialMetadata, ProviderError>> for ProviderResult {
    fn from(result: Result<PartialMetadata, ProviderError>) -> Self {
        match result {
            Ok(partial) if partial.is_empty() => ProviderResult::Empty,
            Ok(partial) => ProviderResult::Success(partial),
            Err(ProviderError::NoMatches) => ProviderResult::Empty,
            Err(e) => ProviderResult::Failure(e),
        }
    }
}

/// Errors a provider call can produce.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(ProviderId),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Audio analysis failed: {0}")]
    Analysis(String),

    #[error("No matches found")]
    NoMatches,
}

impl ProviderError {
    /// Missing or rejected credentials - never worth retrying.
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_) | ProviderError::Auth(_))
    }
}

/// Errors surfaced by the aggregator itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichmentError {
    #[error("Invalid request: {0}")]
    Validation(String),
}

// ============================================================================
// Field validation helpers shared by the adapters
// ============================================================================

/// Parse a BPM value, rejecting anything that isn't a plausible number.
pub fn parse_bpm(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|b| valid_bpm(*b))
}

/// Accept a BPM from a JSON value that may be a number or a numeric string.
pub fn bpm_from_json(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|b| valid_bpm(*b)),
        serde_json::Value::String(s) => parse_bpm(s),
        _ => None,
    }
}

fn valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0 && bpm <= 999.0
}

/// Parse a year from "2011", "2011-10-28" or similar date prefixes.
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok().filter(|y| *y >= 1000)
}

/// Accept a year from a JSON number or string.
pub fn year_from_json(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .filter(|y| (1000..=9999).contains(y)),
        serde_json::Value::String(s) => parse_year(s),
        _ => None,
    }
}

/// Capitalize the first letter of each word ("progressive house" -> "Progressive House").
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize key notations ("F#m", "Ebmaj", "F♯ minor") to "F# Minor" style.
pub fn normalize_key(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace('♯', "#").replace('♭', "b");
    let mut chars = cleaned.chars();
    let root = chars.next()?.to_ascii_uppercase();
    if !('A'..='G').contains(&root) {
        return None;
    }

    // No mode spelling starts with 'b', so a 'b' after the root is a flat.
    let rest = chars.as_str();
    let (accidental, rest) = match rest.chars().next() {
        Some('#') => ("#", &rest[1..]),
        Some('b') => ("b", &rest[1..]),
        _ => ("", rest),
    };

    let mode = match rest.trim().to_ascii_lowercase().as_str() {
        "" | "maj" | "major" => "Major",
        "m" | "min" | "minor" => "Minor",
        _ => return None,
    };

    Some(format!("{}{} {}", root, accidental, mode))
}

/// Trimmed, non-blank string or `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn fill_text(slot: &mut Option<String>, other: &Option<String>) {
    if text(slot).is_none()
        && let Some(value) = text(other)
    {
        *slot = Some(value.to_string());
    }
}
