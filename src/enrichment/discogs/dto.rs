//! Discogs API Data Transfer Objects
//!
//! These types match what `/database/search?type=release` returns.
//! DO NOT use these types outside the discogs module.
//!
//! Example response:
//! ```json
//! {
//!   "results": [{
//!     "title": "Avicii - Levels",
//!     "year": "2011",
//!     "label": ["Universal Music AB", "PRMD"],
//!     "genre": ["Electronic"],
//!     "style": ["Progressive House"],
//!     "type": "release"
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Database search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    /// Error message on failed requests
    pub message: Option<String>,
}

/// A single release hit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    /// "Artist - Release Title"
    pub title: String,
    /// Year as string (sometimes a number, sometimes missing)
    #[serde(default)]
    pub year: serde_json::Value,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(rename = "type")]
    pub result_type: Option<String>,
}
