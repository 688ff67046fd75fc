//! GetSongBPM API Data Transfer Objects
//!
//! These types match what the `/search/` endpoint returns.
//! DO NOT use these types outside the getsongbpm module - convert to domain types.
//!
//! Example response:
//! ```json
//! {
//!   "search": [{
//!     "id": "lOgzO",
//!     "title": "Levels",
//!     "tempo": "126",
//!     "key_of": "C♯m",
//!     "artist": {"name": "Avicii", "genres": ["house", "pop"]},
//!     "album": {"title": "Levels", "year": "2011"}
//!   }]
//! }
//! ```
//!
//! When nothing matches, `search` is an object instead of a list:
//! `{"search": {"error": "no result"}}`.

use serde::{Deserialize, Serialize};

/// Top-level search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub search: Option<SearchPayload>,
    /// Set instead of `search` when the request itself is rejected
    pub error: Option<String>,
}

/// Either a list of songs or an inline "no result" marker
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SearchPayload {
    Songs(Vec<Song>),
    Error { error: String },
}

/// A song hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    /// Usually a numeric string, occasionally empty or missing
    #[serde(default)]
    pub tempo: serde_json::Value,
    /// Key in short notation ("Em", "F♯m")
    pub key_of: Option<String>,
    pub artist: Option<SongArtist>,
    pub album: Option<SongAlbum>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongAlbum {
    pub title: Option<String>,
    /// Year as string or number
    #[serde(default)]
    pub year: serde_json::Value,
}
