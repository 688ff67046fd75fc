//! MusicBrainz API integration
//!
//! Open recording database: solid album, release date and duration data,
//! no credentials needed. Searched by title and artist.
//!
//! API docs: https://musicbrainz.org/doc/MusicBrainz_API/Search

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_partial;
pub use client::{MIN_REQUEST_INTERVAL, MusicBrainzClient};
