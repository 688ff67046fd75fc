//! Command-line interface for crate-digger.
//!
//! This module provides CLI commands for downloading playlists, searching
//! track metadata and checking the local setup.

mod commands;

pub use commands::{Cli, Commands, run_command};
