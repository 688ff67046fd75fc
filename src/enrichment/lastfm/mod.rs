//! Last.fm API integration
//!
//! Listener-driven tag catalog. Good for genre and album names, weak on
//! anything numeric. Requires an API key.
//!
//! API docs: https://www.last.fm/api/show/track.getInfo

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_partial;
pub use client::LastFmClient;
