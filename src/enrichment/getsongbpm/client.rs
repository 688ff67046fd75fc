//! GetSongBPM HTTP client
//!
//! See: https://getsongbpm.com/api

use super::{adapter, dto};
use crate::enrichment::domain::{PartialMetadata, ProviderError, ProviderId, TrackQuery};
use crate::enrichment::http;

/// GetSongBPM API client
pub struct GetSongBpmClient {
    api_key: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl GetSongBpmClient {
    /// Create a new client. `None` or a blank key leaves the client unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http_client: http::build_client(),
            base_url: "https://api.getsong.co".to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::new(api_key)
        }
    }

    /// Whether an API key is present
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search for a song and return its tempo/key data
    pub async fn search(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured(ProviderId::GetSongBpm))?;

        let url = self.search_url(api_key, query);
        let response: dto::SearchResponse =
            http::send_json(self.http_client.get(&url)).await?;

        adapter::to_partial(response, query)
    }

    /// Build the search URL. Title-only queries use `type=song`.
    fn search_url(&self, api_key: &str, query: &TrackQuery) -> String {
        let (kind, lookup) = match query.artist.as_deref() {
            Some(artist) => ("both", format!("song:{} artist:{}", query.title, artist)),
            None => ("song", query.title.clone()),
        };

        format!(
            "{}/search/?api_key={}&type={}&lookup={}",
            self.base_url,
            urlencoding::encode(api_key),
            kind,
            urlencoding::encode(&lookup)
        )
    }
}
