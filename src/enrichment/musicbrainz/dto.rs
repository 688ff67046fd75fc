//! MusicBrainz API Data Transfer Objects
//!
//! These types match what the `/recording?query=` search endpoint returns.
//! DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the musicbrainz module - convert to domain types.
//!
//! API Reference: https://musicbrainz.org/doc/MusicBrainz_API/Search#Recording

use serde::{Deserialize, Serialize};

/// Recording search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub recordings: Vec<Recording>,
}

/// A recording hit
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Recording {
    /// MusicBrainz recording ID
    pub id: String,
    /// Search relevance (0-100)
    pub score: Option<u32>,
    /// Track title
    pub title: String,
    /// Duration in milliseconds
    pub length: Option<u64>,
    /// Earliest release date of any release containing this recording
    pub first_release_date: Option<String>,
    /// Artist credits
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Releases this recording appears on
    #[serde(default)]
    pub releases: Vec<Release>,
    /// Folksonomy tags
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Artist credit (can be multiple for collaborations)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistCredit {
    /// The artist
    pub artist: Artist,
    /// How this artist is credited (may differ from official name)
    pub name: Option<String>,
    /// Join phrase (e.g., " & ", " feat. ")
    pub joinphrase: Option<String>,
}

/// Artist info
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Release (album/single/EP)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    pub id: String,
    pub title: String,
    /// Release status (Official, Bootleg, etc.)
    pub status: Option<String>,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub date: Option<String>,
    pub release_group: Option<ReleaseGroup>,
}

/// Release group (e.g., "Abbey Road" across all editions)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseGroup {
    pub id: String,
    /// Primary type (Album, Single, EP, etc.)
    pub primary_type: Option<String>,
}

/// Folksonomy tag with vote count
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tag {
    pub count: i32,
    pub name: String,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================
