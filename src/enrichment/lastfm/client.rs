//! Last.fm HTTP client
//!
//! `track.getInfo` needs an artist. For title-only queries we first ask
//! `track.search` for the most plausible artist and then look that up.

use super::{adapter, dto};
use crate::enrichment::domain::{PartialMetadata, ProviderError, ProviderId, TrackQuery};
use crate::enrichment::{http, matching};

/// Last.fm API client
pub struct LastFmClient {
    api_key: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl LastFmClient {
    /// Create a new client. `None` or a blank key leaves the client unconfigured.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http_client: http::build_client(),
            base_url: "https://ws.audioscrobbler.com/2.0/".to_string(),
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

    /// Look up track info, resolving the artist first for title-only queries
    pub async fn search(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured(ProviderId::LastFm))?;

        let (title, artist) = match query.artist.as_deref() {
            Some(artist) => (query.title.clone(), artist.to_string()),
            None => self.find_artist(api_key, query).await?,
        };

        let url = format!(
            "{}?method=track.getInfo&api_key={}&artist={}&track={}&autocorrect=1&format=json",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(&artist),
            urlencoding::encode(&title)
        );

        let response: dto::TrackInfoResponse =
            http::send_json(self.http_client.get(&url)).await?;
        adapter::to_partial(response)
    }

    /// Use `track.search` to turn a bare title into a (title, artist) pair
    async fn find_artist(
        &self,
        api_key: &str,
        query: &TrackQuery,
    ) -> Result<(String, String), ProviderError> {
        let url = format!(
            "{}?method=track.search&api_key={}&track={}&limit=5&format=json",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(&query.title)
        );

        let response: dto::TrackSearchResponse =
            http::send_json(self.http_client.get(&url)).await?;

        if let Some(code) = response.error {
            return Err(adapter::classify_error(
                code,
                response.message.as_deref().unwrap_or(""),
            ));
        }

        let matches = response
            .results
            .map(|r| r.trackmatches.track.into_vec())
            .unwrap_or_default();

        matching::pick_best(query, matches, |m| (Some(m.name.as_str()), Some(m.artist.as_str())))
            .map(|m| (m.name, m.artist))
            .ok_or(ProviderError::NoMatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LastFmClient::new(Some("key".to_string()));
        assert!(client.is_configured());
        assert_eq!(client.base_url, "https://ws.audioscrobbler.com/2.0/");
    }

    #[test]
    fn test_client_with_custom_url() {
        let client = LastFmClient::with_base_url(None, "http://localhost:8080");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_search_fails_without_network() {
        let client = LastFmClient::with_base_url(None, "http://127.0.0.1:9");
        let query = TrackQuery::new("Levels", "").unwrap();
        assert_eq!(
            client.search(&query).await,
            Err(ProviderError::NotConfigured(ProviderId::LastFm))
        );
    }
}
