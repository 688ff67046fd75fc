//! Beatport catalog integration
//!
//! Beatport has no public search API, so this provider reads the search
//! results page and pulls the embedded page state out of it. Slow and
//! brittle compared to the JSON APIs, but the most accurate source of BPM,
//! key, label and genre for electronic music. Only queried when the caller
//! opts into the extended provider.

pub mod dto;
mod adapter;
mod client;

pub use adapter::{extract_page_state, to_partial};
pub use client::BeatportClient;
