//! Trait definitions for metadata provider clients.
//!
//! The aggregator only talks to providers through [`MetadataProvider`], so
//! tests can substitute mock implementations with scripted responses,
//! delays and failures.
//!
//! # Example
//!
//! ```ignore
//! use crate_digger::enrichment::traits::MetadataProvider;
//!
//! async fn lookup(provider: &dyn MetadataProvider, query: &TrackQuery) {
//!     if provider.is_configured() {
//!         let partial = provider.fetch(query).await?;
//!     }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use super::domain::{PartialMetadata, ProviderError, ProviderId, TrackQuery};

/// A catalog that can be searched by title and artist.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Which catalog this is.
    fn id(&self) -> ProviderId;

    /// Whether the provider has the credentials it needs. Unconfigured
    /// providers are skipped without a network call.
    fn is_configured(&self) -> bool;

    /// Shortest allowed gap between two calls, for catalogs that enforce a
    /// request rate. The aggregator waits for a slot before the call's
    /// timeout starts.
    fn min_request_interval(&self) -> Option<Duration> {
        None
    }

    /// Search the catalog and return whatever fields it knows.
    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError>;
}

// Implement the trait for the real clients

#[async_trait]
impl MetadataProvider for super::getsongbpm::GetSongBpmClient {
    fn id(&self) -> ProviderId {
        ProviderId::GetSongBpm
    }

    fn is_configured(&self) -> bool {
        self.is_configured()
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.search(query).await
    }
}

#[async_trait]
impl MetadataProvider for super::discogs::DiscogsClient {
    fn id(&self) -> ProviderId {
        ProviderId::Discogs
    }

    fn is_configured(&self) -> bool {
        self.is_configured()
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.search(query).await
    }
}

#[async_trait]
impl MetadataProvider for super::beatport::BeatportClient {
    fn id(&self) -> ProviderId {
        ProviderId::Beatport
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.search(query).await
    }
}

#[async_trait]
impl MetadataProvider for super::musicbrainz::MusicBrainzClient {
    fn id(&self) -> ProviderId {
        ProviderId::MusicBrainz
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn min_request_interval(&self) -> Option<Duration> {
        Some(super::musicbrainz::MIN_REQUEST_INTERVAL)
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.search(query).await
    }
}

#[async_trait]
impl MetadataProvider for super::lastfm::LastFmClient {
    fn id(&self) -> ProviderId {
        ProviderId::LastFm
    }

    fn is_configured(&self) -> bool {
        self.is_configured()
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.search(query).await
    }
}

#[async_trait]
impl MetadataProvider for super::analysis::AudioAnalyzer {
    fn id(&self) -> ProviderId {
        ProviderId::Analysis
    }

    fn is_configured(&self) -> bool {
        self.is_enabled()
    }

    async fn fetch(&self, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
        self.analyze(query).await
    }
}
