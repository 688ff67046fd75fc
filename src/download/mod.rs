//! Playlist downloads: enumerate, resolve, download, convert, enrich, tag.
//!
//! - `job.rs` - per-track state machine and the job's shared counters
//! - `orchestrator.rs` - bounded-concurrency pipeline producing a report

pub mod job;
pub mod orchestrator;

pub use job::{PlaylistJob, TrackItem, TrackStatus};
pub use orchestrator::{DownloadOptions, DownloadReport, JobEvent, PlaylistDownloader};
