//! Job state shared by the concurrent track workers.
//!
//! Every mutation goes through one lock. Items move forward through
//! `pending -> resolving -> downloading -> converting -> (enriching) -> completed`
//! or drop to `failed`; once terminal they never change again.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Serialize;

use crate::enrichment::Metadata;
use crate::media::{ResolvedTrack, TrackRef};

/// Where a track is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Pending,
    Resolving,
    Downloading,
    Converting,
    Enriching,
    Completed,
    Failed,
}

impl TrackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrackStatus::Completed | TrackStatus::Failed)
    }

    /// Holding a concurrency slot
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TrackStatus::Resolving
                | TrackStatus::Downloading
                | TrackStatus::Converting
                | TrackStatus::Enriching
        )
    }

    /// Rough progress when entering this status
    fn progress(self) -> u8 {
        match self {
            TrackStatus::Pending => 0,
            TrackStatus::Resolving => 5,
            TrackStatus::Downloading => 20,
            TrackStatus::Converting => 60,
            TrackStatus::Enriching => 80,
            TrackStatus::Completed => 100,
            // Failed items keep the progress they had
            TrackStatus::Failed => 0,
        }
    }
}

/// One playlist member
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackItem {
    pub id: String,
    pub index: usize,
    pub source: String,
    #[serde(skip)]
    pub reference: TrackRef,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub status: TrackStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl TrackItem {
    fn new(index: usize, reference: TrackRef) -> Self {
        Self {
            id: reference.id(),
            index,
            source: reference.to_string(),
            reference,
            title: None,
            artist: None,
            status: TrackStatus::Pending,
            progress: 0,
            error: None,
            output_path: None,
            metadata: None,
        }
    }

    /// "Artist - Title" once resolved, the source reference before that
    pub fn label(&self) -> String {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => format!("{} - {}", artist, title),
            (None, Some(title)) => title.clone(),
            _ => self.source.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct JobState {
    items: Vec<TrackItem>,
    processed: usize,
    enhanced: usize,
    errors: Vec<String>,
    active: usize,
    peak_active: usize,
}

impl JobState {
    /// Apply a status change, keeping the active count in step.
    /// Returns `None` if the item is unknown or already terminal.
    fn set_status(&mut self, index: usize, status: TrackStatus) -> Option<&mut TrackItem> {
        let item = self.items.get(index)?;
        if item.status.is_terminal() {
            return None;
        }

        let was_active = item.status.is_active();
        if !was_active && status.is_active() {
            self.active += 1;
            self.peak_active = self.peak_active.max(self.active);
        } else if was_active && !status.is_active() {
            self.active -= 1;
        }

        let item = self.items.get_mut(index)?;
        item.status = status;
        if status != TrackStatus::Failed {
            item.progress = status.progress();
        }
        Some(item)
    }
}

/// Point-in-time copy of the job's counters and items
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub items: Vec<TrackItem>,
    pub processed: usize,
    pub enhanced: usize,
    pub errors: Vec<String>,
    pub peak_active: usize,
}

/// A playlist being processed
#[derive(Debug)]
pub struct PlaylistJob {
    state: Mutex<JobState>,
    max_concurrent: usize,
}

impl PlaylistJob {
    pub fn new(refs: Vec<TrackRef>, max_concurrent: usize) -> Self {
        let items = refs
            .into_iter()
            .enumerate()
            .map(|(index, reference)| TrackItem::new(index, reference))
            .collect();
        Self {
            state: Mutex::new(JobState {
                items,
                ..Default::default()
            }),
            max_concurrent,
        }
    }

    pub fn total(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn reference(&self, index: usize) -> Option<TrackRef> {
        self.state
            .lock()
            .items
            .get(index)
            .map(|item| item.reference.clone())
    }

    /// Move an item to a non-terminal status. Returns the updated item.
    pub fn transition(&self, index: usize, status: TrackStatus) -> Option<TrackItem> {
        debug_assert!(!status.is_terminal(), "use complete() or fail()");
        self.state
            .lock()
            .set_status(index, status)
            .map(|item| item.clone())
    }

    /// Record what the resolver found
    pub fn set_resolved(&self, index: usize, track: &ResolvedTrack) {
        let mut state = self.state.lock();
        if let Some(item) = state.items.get_mut(index) {
            item.title = Some(track.title.clone());
            item.artist = track.artist.clone();
        }
    }

    /// Mark an item completed
    pub fn complete(
        &self,
        index: usize,
        output_path: PathBuf,
        metadata: Option<Metadata>,
    ) -> Option<TrackItem> {
        let mut state = self.state.lock();
        let enhanced = metadata.as_ref().is_some_and(Metadata::has_contributions);

        let item = state.set_status(index, TrackStatus::Completed)?;
        item.output_path = Some(output_path);
        item.metadata = metadata;
        let snapshot = item.clone();

        state.processed += 1;
        if enhanced {
            state.enhanced += 1;
        }
        Some(snapshot)
    }

    /// Mark an item failed, recording `"<label>: <cause>"` in the job errors
    pub fn fail(&self, index: usize, cause: &str) -> Option<TrackItem> {
        let mut state = self.state.lock();

        let item = state.set_status(index, TrackStatus::Failed)?;
        let message = format!("{}: {}", item.label(), cause);
        item.error = Some(cause.to_string());
        let snapshot = item.clone();

        state.processed += 1;
        state.errors.push(message);
        Some(snapshot)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.lock();
        JobSnapshot {
            items: state.items.clone(),
            processed: state.processed,
            enhanced: state.enhanced,
            errors: state.errors.clone(),
            peak_active: state.peak_active,
        }
    }
}
