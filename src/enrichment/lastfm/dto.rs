//! Last.fm API Data Transfer Objects
//!
//! These types match what `track.getInfo` and `track.search` return in
//! JSON mode. DO NOT use these types outside the lastfm module.
//!
//! Last.fm's JSON is a mechanical translation of XML, so collections that
//! hold exactly one element are sometimes emitted as a bare object instead
//! of a one-element array. [`OneOrMany`] absorbs that.

use serde::{Deserialize, Serialize};

/// A list that may be serialized as a single object
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Error payload shared by every method
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: i32,
    pub message: String,
}

/// `track.getInfo` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackInfoResponse {
    pub track: Option<TrackInfo>,
    pub error: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackInfo {
    pub name: String,
    /// Milliseconds, as a string ("215000")
    #[serde(default)]
    pub duration: serde_json::Value,
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub toptags: Option<TopTags>,
    pub wiki: Option<Wiki>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumRef {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopTags {
    #[serde(default)]
    pub tag: OneOrMany<Tag>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Wiki {
    /// e.g. "14 Oct 2011, 00:00"
    pub published: Option<String>,
}

/// `track.search` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackSearchResponse {
    pub results: Option<SearchResults>,
    pub error: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResults {
    pub trackmatches: TrackMatches,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackMatches {
    #[serde(default)]
    pub track: OneOrMany<TrackMatch>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackMatch {
    pub name: String,
    pub artist: String,
}
