//! Track metadata enrichment - searches external catalogs and merges what they know.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types that represent our business logic
//! - **API DTOs** (`<provider>/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for external APIs
//! - **Analysis** (`analysis/`) - Tempo and key measured from the local file
//! - **Traits** (`traits.rs`) - The seam the aggregator uses, and the mocks behind it
//! - **Service** - Concurrent fan-out and priority merge
//!
//! This decoupling means:
//! 1. API changes don't ripple through our codebase
//! 2. We can test API contracts independently
//! 3. We can swap providers without changing business logic
//!
//! # Usage
//!
//! ```ignore
//! use crate_digger::enrichment::{MetadataAggregator, SearchOptions};
//!
//! let aggregator = MetadataAggregator::from_config(&config);
//! let metadata = aggregator
//!     .search_metadata("Levels", "Avicii", &SearchOptions::default())
//!     .await?;
//! println!("BPM: {:?}, Key: {:?}", metadata.bpm, metadata.key);
//! ```

pub mod domain;
pub mod analysis;
pub mod beatport;
pub mod discogs;
pub mod getsongbpm;
pub mod http;
pub mod lastfm;
pub mod matching;
pub mod musicbrainz;
pub mod service;
pub mod traits;

pub use domain::{
    EnrichmentError, Metadata, PartialMetadata, ProviderError, ProviderId, ProviderResult,
    SearchOptions, TrackQuery,
};
pub use service::{AggregatorConfig, ConfigurationStatus, MetadataAggregator};
pub use traits::MetadataProvider;
