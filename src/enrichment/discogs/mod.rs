//! Discogs API integration
//!
//! Discography catalog: the most reliable source for record label and
//! release year. Requires a personal access token.
//!
//! API docs: https://www.discogs.com/developers#page:database,header:database-search

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_partial;
pub use client::DiscogsClient;
