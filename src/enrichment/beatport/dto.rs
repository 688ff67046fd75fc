//! Beatport page-state Data Transfer Objects
//!
//! These types match the track objects embedded in the search page's
//! `__NEXT_DATA__` script. Fields are lenient because the page state is
//! not a stable API.
//! DO NOT use these types outside the beatport module - convert to domain types.

use serde::{Deserialize, Serialize};

/// A track as it appears in the search results state
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub track_name: Option<String>,
    /// "Original Mix", "Extended Mix", ...
    pub mix_name: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Number or numeric string
    #[serde(default)]
    pub bpm: serde_json::Value,
    /// "F# Minor", "Eb Major", ...
    pub key_name: Option<String>,
    /// Either a string or a list of `{genre_name}` objects
    #[serde(default)]
    pub genre: serde_json::Value,
    pub label: Option<Label>,
    pub release: Option<Release>,
    pub publish_date: Option<String>,
    /// Duration in milliseconds
    pub length: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub artist_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub label_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Release {
    pub release_name: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// ============================================================================
