//! Shared HTTP plumbing for the provider clients.
//!
//! Every catalog maps HTTP failures the same way: 401/403 mean the
//! credentials are wrong, 404 means no match, 429 means back off, and
//! anything else non-2xx is a transport error.

use serde::de::DeserializeOwned;

use crate::enrichment::domain::ProviderError;

/// User agent sent to every catalog (MusicBrainz and Discogs reject requests without one)
pub const USER_AGENT: &str = concat!(
    "CrateDigger/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/crate-digger)"
);

/// Build the HTTP client used by a provider.
///
/// Falls back to a default client if the configured builder cannot be
/// constructed (e.g. TLS backend initialization failed).
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        })
}

/// Send a request and decode a JSON body.
pub async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = send(request).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Send a request and return the body as text.
pub async fn send_text(request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let response = send(request).await?;
    response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    check_status(response.status())?;
    Ok(response)
}

/// Map an HTTP status to the provider error taxonomy.
pub fn check_status(status: reqwest::StatusCode) -> Result<(), ProviderError> {
    use reqwest::StatusCode;

    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Auth(format!(
            "HTTP {}",
            status.as_u16()
        ))),
        StatusCode::NOT_FOUND => Err(ProviderError::NoMatches),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
        _ => Err(ProviderError::Network(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED),
            Err(ProviderError::Auth(_))
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN),
            Err(ProviderError::Auth(_))
        ));
        assert_eq!(
            check_status(StatusCode::NOT_FOUND),
            Err(ProviderError::NoMatches)
        );
        assert_eq!(
            check_status(StatusCode::TOO_MANY_REQUESTS),
            Err(ProviderError::RateLimited)
        );
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY),
            Err(ProviderError::Network(_))
        ));
    }

    #[test]
    fn test_user_agent_format() {
        assert!(USER_AGENT.starts_with("CrateDigger/"));
    }
}
