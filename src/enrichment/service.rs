//! Metadata aggregator - fans a track query out to every catalog and merges
//!
//! This is the high-level API for track metadata:
//! 1. Pick the providers to ask, in priority order
//! 2. Query them all concurrently, each under its own timeout
//! 3. Merge the answers field by field in priority order
//!
//! Provider failures never fail the search; they only drop that provider's
//! contribution. A provider that rejects its credentials is treated as
//! unconfigured from then on and is not asked again.
//!
//! Catalogs with a request rate get a limiter here rather than in their
//! client. Waiting for a slot happens before the per-call timeout starts, so
//! queuing behind other searches never counts as a slow provider.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::Config;
use crate::enrichment::{
    analysis::AudioAnalyzer,
    beatport::BeatportClient,
    discogs::DiscogsClient,
    domain::{
        EnrichmentError, Metadata, ProviderError, ProviderId, ProviderResult, SearchOptions,
        TrackQuery,
    },
    getsongbpm::GetSongBpmClient,
    lastfm::LastFmClient,
    musicbrainz::MusicBrainzClient,
    traits::MetadataProvider,
};

/// Aggregation settings
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Merge order: earlier providers win field conflicts
    pub priority: Vec<ProviderId>,
    /// Timeout for each regular provider call
    pub provider_timeout: Duration,
    /// Timeout for the extended provider
    pub extended_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            priority: ProviderId::ALL.to_vec(),
            provider_timeout: Duration::from_secs(8),
            extended_timeout: Duration::from_secs(20),
        }
    }
}

impl From<&crate::config::EnrichmentConfig> for AggregatorConfig {
    fn from(config: &crate::config::EnrichmentConfig) -> Self {
        Self {
            priority: config.priority.clone(),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            extended_timeout: Duration::from_secs(config.extended_timeout_secs),
        }
    }
}

/// Which providers have credentials, as reported by the diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationStatus {
    pub providers: BTreeMap<ProviderId, bool>,
    pub configured: usize,
    pub total: usize,
}

type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Queries every registered provider and merges the results
pub struct MetadataAggregator {
    providers: Vec<Arc<dyn MetadataProvider>>,
    config: AggregatorConfig,
    limiters: HashMap<ProviderId, RequestLimiter>,
    /// Providers whose credentials were rejected
    rejected: Mutex<HashSet<ProviderId>>,
}

impl MetadataAggregator {
    /// Create an aggregator over an explicit provider set
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, config: AggregatorConfig) -> Self {
        let limiters = providers
            .iter()
            .filter_map(|provider| {
                let quota = Quota::with_period(provider.min_request_interval()?)?
                    .allow_burst(NonZeroU32::MIN);
                Some((provider.id(), RateLimiter::direct(quota)))
            })
            .collect();

        Self {
            providers,
            config,
            limiters,
            rejected: Mutex::new(HashSet::new()),
        }
    }

    /// Create an aggregator with the real catalog clients
    pub fn from_config(config: &Config) -> Self {
        let credentials = &config.credentials;
        let providers: Vec<Arc<dyn MetadataProvider>> = vec![
            Arc::new(GetSongBpmClient::new(credentials.getsongbpm_api_key.clone())),
            Arc::new(DiscogsClient::new(credentials.discogs_token.clone())),
            Arc::new(BeatportClient::new()),
            Arc::new(MusicBrainzClient::new()),
            Arc::new(LastFmClient::new(credentials.lastfm_api_key.clone())),
            Arc::new(AudioAnalyzer::new(
                config.enrichment.analyze_audio,
                config.enrichment.analysis_max_secs,
            )),
        ];
        Self::new(providers, AggregatorConfig::from(&config.enrichment))
    }

    /// Validate the request and search every selected provider.
    ///
    /// Only a blank title is an error; provider failures are logged and
    /// skipped.
    pub async fn search_metadata(
        &self,
        title: &str,
        artist: &str,
        options: &SearchOptions,
    ) -> Result<Metadata, EnrichmentError> {
        let query = TrackQuery::new(title, artist)?;
        Ok(self.search(&query, options).await)
    }

    /// Search with an already validated query
    pub async fn search(&self, query: &TrackQuery, options: &SearchOptions) -> Metadata {
        let started = Instant::now();
        let selected = self.selected_providers(options);

        // join_all keeps input order, so results line up with the priority list
        let results = join_all(
            selected
                .iter()
                .map(|provider| self.dispatch(provider.as_ref(), query)),
        )
        .await;

        let mut metadata = Metadata::default();
        for (provider, result) in selected.iter().zip(results) {
            let id = provider.id();
            match result {
                ProviderResult::Success(partial) => {
                    tracing::debug!("{} returned {} field(s)", id, partial.field_count());
                    metadata.merge(id, &partial);
                }
                ProviderResult::Empty => {
                    tracing::debug!("{} had no match for '{}'", id, query.title);
                }
                ProviderResult::Failure(e) if e.is_auth() => {
                    tracing::debug!(
                        "{} rejected its credentials, treating as not configured: {}",
                        id,
                        e
                    );
                    self.rejected.lock().insert(id);
                }
                ProviderResult::Failure(e) => {
                    tracing::warn!("{} lookup failed for '{}': {}", id, query.title, e);
                }
            }
        }

        // The caller's own values are better than nothing, but don't count as a source
        if metadata.title.is_none() {
            metadata.title = Some(query.title.clone());
        }
        if metadata.artist.is_none() {
            metadata.artist = query.artist.clone();
        }

        tracing::debug!(
            "Metadata search for '{}' by {} finished in {:?} (sources: {:?})",
            query.title,
            query.artist_or_unknown(),
            started.elapsed(),
            metadata.sources
        );

        metadata
    }

    /// Report which providers have credentials, without any network calls.
    /// Credentials a provider already rejected count as missing.
    pub fn configuration_status(&self) -> ConfigurationStatus {
        let rejected = self.rejected.lock();
        let providers: BTreeMap<ProviderId, bool> = self
            .providers
            .iter()
            .map(|p| (p.id(), p.is_configured() && !rejected.contains(&p.id())))
            .collect();
        let configured = providers.values().filter(|c| **c).count();
        ConfigurationStatus {
            total: providers.len(),
            configured,
            providers,
        }
    }

    /// Providers to query, in priority order
    fn selected_providers(&self, options: &SearchOptions) -> Vec<Arc<dyn MetadataProvider>> {
        let rejected = self.rejected.lock().clone();
        let mut selected: Vec<Arc<dyn MetadataProvider>> = Vec::new();

        for id in &self.config.priority {
            if id.is_extended() && !options.use_extended_provider {
                continue;
            }
            if selected.iter().any(|p| p.id() == *id) {
                continue;
            }
            let Some(provider) = self.providers.iter().find(|p| p.id() == *id) else {
                continue;
            };
            if !provider.is_configured() || rejected.contains(id) {
                tracing::debug!("Skipping {}: not configured", id);
                continue;
            }
            selected.push(Arc::clone(provider));
        }

        selected
    }

    async fn dispatch(&self, provider: &dyn MetadataProvider, query: &TrackQuery) -> ProviderResult {
        let id = provider.id();
        let limit = if id.is_slow() {
            self.config.extended_timeout
        } else {
            self.config.provider_timeout
        };

        if let Some(limiter) = self.limiters.get(&id) {
            limiter.until_ready().await;
        }

        match tokio::time::timeout(limit, provider.fetch(query)).await {
            Ok(result) => ProviderResult::from(result),
            Err(_) => ProviderResult::Failure(ProviderError::Timeout(limit)),
        }
    }
}
