//! GetSongBPM API integration
//!
//! Dedicated tempo/key catalog: the most trustworthy source for BPM and key.
//! Requires a free API key.
//!
//! API docs: https://getsongbpm.com/api

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_partial;
pub use client::GetSongBpmClient;
