//! Beatport search page client

use super::adapter;
use crate::enrichment::domain::{PartialMetadata, ProviderError, TrackQuery};
use crate::enrichment::http;

/// Beatport search client. Needs no credentials.
pub struct BeatportClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BeatportClient {
    /// Create a new client
    pub fn new() -> Self {
        Self {
            http_client: http::build_client(),
            base_url: "https://www.beatport.com".to_string(),
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

    /// Search tracks by "artist title"
    pub async fn search(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let request = self
            .http_client
            .get(self.search_url(query))
            .header("Accept", "text/html");

        let html = http::send_text(request).await?;
        let state = adapter::extract_page_state(&html)?;
        adapter::to_partial(&state, query)
    }

    fn search_url(&self, query: &TrackQuery) -> String {
        let terms = match query.artist.as_deref() {
            Some(artist) => format!("{} {}", artist, query.title),
            None => query.title.clone(),
        };
        format!(
            "{}/search/tracks?q={}",
            self.base_url,
            urlencoding::encode(&terms)
        )
    }
}

impl Default for BeatportClient {
    fn default() -> Self {
        Self::new()
    }
}
