//! MusicBrainz HTTP client
//!
//! Handles communication with the MusicBrainz web service.
//! See: https://musicbrainz.org/doc/MusicBrainz_API
//!
//! IMPORTANT: MusicBrainz requires a User-Agent header and rate limits to 1 req/sec.
//! The client itself holds no state; the aggregator spaces requests using
//! [`MIN_REQUEST_INTERVAL`] before starting the call's timeout.

use std::time::Duration;

use super::{adapter, dto};
use crate::enrichment::domain::{PartialMetadata, ProviderError, TrackQuery};
use crate::enrichment::http;

/// Minimum spacing between requests
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1100);

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicBrainzClient {
    /// Create a new client
    pub fn new() -> Self {
        Self {
            http_client: http::build_client(),
            base_url: "https://musicbrainz.org/ws/2".to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::new()
        }
    }

    /// Search recordings by title (and artist, when known)
    pub async fn search(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let url = format!(
            "{}/recording?query={}&fmt=json&limit=10",
            self.base_url,
            urlencoding::encode(&lucene_query(query))
        );

        let response: dto::SearchResponse = http::send_json(self.http_client.get(&url)).await?;
        adapter::to_partial(response, query)
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a Lucene query for the recording index
fn lucene_query(query: &TrackQuery) -> String {
    let mut lucene = format!("recording:\"{}\"", escape(&query.title));
    if let Some(artist) = query.artist.as_deref() {
        lucene.push_str(&format!(" AND artist:\"{}\"", escape(artist)));
    }
    lucene
}

/// Escape characters that would end a quoted Lucene phrase
fn escape(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}
