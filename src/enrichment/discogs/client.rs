//! Discogs HTTP client
//!
//! Authenticated with a personal access token in the `Authorization` header.
//! Discogs rejects requests without a descriptive User-Agent.

use super::{adapter, dto};
use crate::enrichment::domain::{PartialMetadata, ProviderError, ProviderId, TrackQuery};
use crate::enrichment::http;

/// Discogs API client
pub struct DiscogsClient {
    token: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl DiscogsClient {
    /// Create a new client. `None` or a blank token leaves the client unconfigured.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            http_client: http::build_client(),
            base_url: "https://api.discogs.com".to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::new(token)
        }
    }

    /// Whether a token is present
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Search releases containing the track
    pub async fn search(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let token = self
            .token
            .as_deref()
            .ok_or(ProviderError::NotConfigured(ProviderId::Discogs))?;

        let request = self
            .http_client
            .get(self.search_url(query))
            .header("Authorization", format!("Discogs token={}", token));

        let response: dto::SearchResponse = http::send_json(request).await?;
        adapter::to_partial(response, query)
    }

    fn search_url(&self, query: &TrackQuery) -> String {
        let mut url = format!(
            "{}/database/search?type=release&per_page=10&track={}",
            self.base_url,
            urlencoding::encode(&query.title)
        );
        if let Some(artist) = query.artist.as_deref() {
            url.push_str("&artist=");
            url.push_str(&urlencoding::encode(artist));
        }
        url
    }
}
