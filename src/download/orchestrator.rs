//! Playlist download orchestrator.
//!
//! Runs every playlist member through resolve -> download -> convert ->
//! enrich -> tag with at most `max_concurrent` members in flight. A failing
//! member is recorded and skipped; only bad input or a playlist that can't
//! be read stops the job.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use super::job::{PlaylistJob, TrackItem, TrackStatus};
use crate::config::Config;
use crate::enrichment::{Metadata, MetadataAggregator, SearchOptions, TrackQuery};
use crate::error::{Error, Result};
use crate::media::{
    AudioFormat, Converter, Ffmpeg, MediaDownloader, MediaError, MediaResolver, ResolvedTrack,
    TrackRef, YtDlp, dedupe_refs, naming,
};

/// Per-job settings
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub format: AudioFormat,
    pub enhance_metadata: bool,
    pub max_concurrent: usize,
    pub use_extended_provider: bool,
    /// Limit for one track's whole pipeline
    pub item_timeout: Option<Duration>,
    /// Tracks not started by this deadline are failed
    pub job_timeout: Option<Duration>,
    pub download_dir: PathBuf,
    pub write_tags: bool,
}

impl DownloadOptions {
    pub fn from_config(config: &Config) -> Self {
        let download = &config.download;
        Self {
            format: download.format,
            enhance_metadata: download.enhance_metadata,
            max_concurrent: download.max_concurrent,
            use_extended_provider: config.enrichment.use_extended_provider,
            item_timeout: download.item_timeout_secs.map(Duration::from_secs),
            job_timeout: download.job_timeout_secs.map(Duration::from_secs),
            download_dir: download.directory.clone(),
            write_tags: download.write_tags,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::validation("max_concurrent must be at least 1"));
        }
        Ok(())
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Progress notifications
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A track changed status
    ItemUpdated(TrackItem),
    /// Every track is terminal
    Finished {
        success: bool,
        processed_tracks: usize,
        total_tracks: usize,
    },
}

/// Outcome of a whole job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    /// False only when the job could not start
    pub success: bool,
    pub total_tracks: usize,
    pub processed_tracks: usize,
    pub enhanced_tracks: usize,
    /// Percentage of tracks that got metadata from at least one provider
    pub enhancement_rate: u32,
    pub download_path: PathBuf,
    pub errors: Vec<String>,
    pub items: Vec<TrackItem>,
    /// Most tracks in flight at once
    pub peak_concurrency: usize,
    pub duration_ms: u64,
    /// RFC 3339
    pub finished_at: String,
}

impl DownloadReport {
    fn from_job(job: &PlaylistJob, options: &DownloadOptions, started: Instant) -> Self {
        let snapshot = job.snapshot();
        let total_tracks = snapshot.items.len();
        Self {
            success: true,
            total_tracks,
            processed_tracks: snapshot.processed,
            enhanced_tracks: snapshot.enhanced,
            enhancement_rate: enhancement_rate(snapshot.enhanced, total_tracks),
            download_path: options.download_dir.clone(),
            errors: snapshot.errors,
            items: snapshot.items,
            peak_concurrency: snapshot.peak_active,
            duration_ms: elapsed_ms(started),
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn not_started(options: &DownloadOptions, started: Instant, cause: String) -> Self {
        Self {
            success: false,
            total_tracks: 0,
            processed_tracks: 0,
            enhanced_tracks: 0,
            enhancement_rate: 0,
            download_path: options.download_dir.clone(),
            errors: vec![cause],
            items: Vec::new(),
            peak_concurrency: 0,
            duration_ms: elapsed_ms(started),
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn enhancement_rate(enhanced: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((enhanced as f64 / total as f64) * 100.0).round() as u32
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Output paths handed out during this job, so two tracks with the same
/// name don't race for one file
#[derive(Default)]
struct NameReservations(Mutex<HashSet<PathBuf>>);

impl NameReservations {
    fn reserve(&self, dir: &Path, stem: &str, ext: &str) -> PathBuf {
        let mut taken = self.0.lock();
        let path = naming::unique_path(dir, stem, ext, |p| taken.contains(p) || p.exists());
        taken.insert(path.clone());
        path
    }
}

/// What a finished pipeline produced
struct ItemOutcome {
    output_path: PathBuf,
    metadata: Option<Metadata>,
}

/// Downloads playlists with bounded concurrency
pub struct PlaylistDownloader {
    resolver: Arc<dyn MediaResolver>,
    downloader: Arc<dyn MediaDownloader>,
    converter: Arc<dyn Converter>,
    aggregator: Arc<MetadataAggregator>,
    events: Option<UnboundedSender<JobEvent>>,
}

impl PlaylistDownloader {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        downloader: Arc<dyn MediaDownloader>,
        converter: Arc<dyn Converter>,
        aggregator: Arc<MetadataAggregator>,
    ) -> Self {
        Self {
            resolver,
            downloader,
            converter,
            aggregator,
            events: None,
        }
    }

    /// Wire up yt-dlp, ffmpeg and the real catalog clients
    pub fn from_config(config: &Config) -> Self {
        let ytdlp = Arc::new(YtDlp::new(config.tools.ytdlp_path.clone()));
        Self::new(
            ytdlp.clone(),
            ytdlp,
            Arc::new(Ffmpeg::new(config.tools.ffmpeg_path.clone())),
            Arc::new(MetadataAggregator::from_config(config)),
        )
    }

    /// Send progress events to `sender`
    pub fn with_events(mut self, sender: UnboundedSender<JobEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Download every member of a playlist (or a single-track URL).
    ///
    /// Returns `Err` only for invalid input. A playlist that can't be read or
    /// a download directory that can't be created produce a report with
    /// `success: false`.
    pub async fn download_playlist(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<DownloadReport> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("url is required"));
        }
        options.validate()?;

        let started = Instant::now();
        if let Err(report) = self.prepare_dir(options, started).await {
            return Ok(report);
        }

        let refs = match self.resolver.enumerate(url).await {
            Ok(refs) => refs,
            Err(e) => {
                tracing::warn!("Could not read playlist {}: {}", url, e);
                let report = DownloadReport::not_started(options, started, e.to_string());
                self.emit_finished(&report);
                return Ok(report);
            }
        };

        tracing::info!("Playlist {} has {} track(s)", url, refs.len());
        Ok(self.run_job(refs, options, started).await)
    }

    /// Download an explicit list of references (e.g. a single search pair)
    pub async fn download_tracks(
        &self,
        refs: Vec<TrackRef>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport> {
        if refs.is_empty() {
            return Err(Error::validation("at least one track is required"));
        }
        options.validate()?;

        let started = Instant::now();
        if let Err(report) = self.prepare_dir(options, started).await {
            return Ok(report);
        }

        Ok(self.run_job(dedupe_refs(refs), options, started).await)
    }

    async fn prepare_dir(
        &self,
        options: &DownloadOptions,
        started: Instant,
    ) -> std::result::Result<(), DownloadReport> {
        if let Err(e) = tokio::fs::create_dir_all(&options.download_dir).await {
            tracing::warn!(
                "Could not prepare download directory {:?}: {}",
                options.download_dir,
                e
            );
            let report = DownloadReport::not_started(
                options,
                started,
                format!(
                    "Could not prepare download directory {}: {}",
                    options.download_dir.display(),
                    e
                ),
            );
            self.emit_finished(&report);
            return Err(report);
        }
        Ok(())
    }

    async fn run_job(
        &self,
        refs: Vec<TrackRef>,
        options: &DownloadOptions,
        started: Instant,
    ) -> DownloadReport {
        let job = PlaylistJob::new(refs, options.max_concurrent);
        let deadline = options.job_timeout.map(|limit| started + limit);
        let names = NameReservations::default();

        tracing::info!(
            "Starting job: {} track(s), up to {} at a time, format {}",
            job.total(),
            job.max_concurrent(),
            options.format
        );

        // A member's future only starts once a slot is free, and the slot is
        // held until that member is terminal
        stream::iter(0..job.total())
            .map(|index| self.process_item(&job, index, options, deadline, &names))
            .buffer_unordered(job.max_concurrent())
            .collect::<Vec<()>>()
            .await;

        let report = DownloadReport::from_job(&job, options, started);
        tracing::info!(
            "Job finished: {}/{} processed, {} enhanced, {} error(s) in {} ms",
            report.processed_tracks,
            report.total_tracks,
            report.enhanced_tracks,
            report.errors.len(),
            report.duration_ms
        );
        self.emit_finished(&report);
        report
    }

    async fn process_item(
        &self,
        job: &PlaylistJob,
        index: usize,
        options: &DownloadOptions,
        deadline: Option<Instant>,
        names: &NameReservations,
    ) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            self.fail(job, index, "job deadline reached before the track started");
            return;
        }
        let Some(reference) = job.reference(index) else {
            return;
        };

        let pipeline = self.run_pipeline(job, index, &reference, options, names);
        let outcome = match options.item_timeout {
            Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                Ok(outcome) => outcome.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {}s", limit.as_secs_f64())),
            },
            None => pipeline.await.map_err(|e| e.to_string()),
        };

        match outcome {
            Ok(done) => {
                if let Some(item) = job.complete(index, done.output_path, done.metadata) {
                    tracing::debug!("Completed {}", item.label());
                    self.emit(JobEvent::ItemUpdated(item));
                }
            }
            Err(cause) => self.fail(job, index, &cause),
        }
    }

    async fn run_pipeline(
        &self,
        job: &PlaylistJob,
        index: usize,
        reference: &TrackRef,
        options: &DownloadOptions,
        names: &NameReservations,
    ) -> std::result::Result<ItemOutcome, MediaError> {
        self.update(job, index, TrackStatus::Resolving);
        let resolved = self.resolver.resolve(reference).await?;
        job.set_resolved(index, &resolved);

        self.update(job, index, TrackStatus::Downloading);
        let raw = self.downloader.download(&resolved, &options.download_dir).await?;
        let mut partial = PartialFiles::new(raw.clone());

        self.update(job, index, TrackStatus::Converting);
        let target = names.reserve(
            &options.download_dir,
            &naming::track_stem(resolved.artist.as_deref(), &resolved.title),
            options.format.extension(),
        );
        partial.output = Some(target.clone());
        let converted = self.converter.convert(&raw, options.format, &target).await;
        if raw != target {
            remove_raw(&raw).await;
        }
        partial.raw = None;
        let output_path = converted?;
        partial.output = Some(output_path.clone());

        let metadata = if options.enhance_metadata {
            self.update(job, index, TrackStatus::Enriching);
            self.enrich(&resolved, &output_path, options).await
        } else {
            None
        };

        if options.write_tags
            && let Some(ref metadata) = metadata
        {
            write_tags(&output_path, metadata).await;
        }

        partial.keep();
        Ok(ItemOutcome {
            output_path,
            metadata,
        })
    }

    async fn enrich(
        &self,
        track: &ResolvedTrack,
        file: &Path,
        options: &DownloadOptions,
    ) -> Option<Metadata> {
        let query = match TrackQuery::new(&track.title, track.artist.as_deref().unwrap_or_default())
        {
            Ok(query) => query.with_file(file),
            Err(e) => {
                tracing::debug!("Skipping metadata search for {}: {}", track.download_ref, e);
                return None;
            }
        };

        let search = SearchOptions {
            use_extended_provider: options.use_extended_provider,
        };
        Some(self.aggregator.search(&query, &search).await)
    }

    fn update(&self, job: &PlaylistJob, index: usize, status: TrackStatus) {
        if let Some(item) = job.transition(index, status) {
            self.emit(JobEvent::ItemUpdated(item));
        }
    }

    fn fail(&self, job: &PlaylistJob, index: usize, cause: &str) {
        if let Some(item) = job.fail(index, cause) {
            tracing::warn!("Track failed: {}: {}", item.label(), cause);
            self.emit(JobEvent::ItemUpdated(item));
        }
    }

    fn emit(&self, event: JobEvent) {
        if let Some(ref sender) = self.events {
            // A dropped receiver just means nobody is watching
            let _ = sender.send(event);
        }
    }

    fn emit_finished(&self, report: &DownloadReport) {
        self.emit(JobEvent::Finished {
            success: report.success,
            processed_tracks: report.processed_tracks,
            total_tracks: report.total_tracks,
        });
    }
}

/// Files an unfinished pipeline leaves behind. Dropping the guard before
/// [`PartialFiles::keep`] deletes them, so a failed or timed-out item
/// leaves nothing on disk.
struct PartialFiles {
    raw: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl PartialFiles {
    fn new(raw: PathBuf) -> Self {
        Self {
            raw: Some(raw),
            output: None,
        }
    }

    fn keep(&mut self) {
        self.raw = None;
        self.output = None;
    }
}

impl Drop for PartialFiles {
    fn drop(&mut self) {
        for path in [self.raw.take(), self.output.take()].into_iter().flatten() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed unfinished file {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::debug!("Could not remove unfinished file {:?}: {}", path, e),
            }
        }
    }
}

async fn remove_raw(raw: &Path) {
    if let Err(e) = tokio::fs::remove_file(raw).await {
        tracing::debug!("Could not remove raw download {:?}: {}", raw, e);
    }
}

/// Tag writing is best effort: a failure is logged and the track still counts
async fn write_tags(path: &Path, metadata: &Metadata) {
    let path_buf = path.to_path_buf();
    let metadata = metadata.clone();
    match tokio::task::spawn_blocking(move || crate::metadata::write(&path_buf, &metadata)).await {
        Ok(Ok(fields)) => tracing::debug!("Wrote {} tag field(s) to {:?}", fields, path),
        Ok(Err(e)) => tracing::warn!("Tag write failed: {}", e),
        Err(e) => tracing::warn!("Tag write task failed for {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::traits::mocks::MockProvider;
    use crate::enrichment::{
        AggregatorConfig, MetadataProvider, PartialMetadata, ProviderError, ProviderId,
    };
    use crate::test_utils::{MockConverter, MockDownloader, MockResolver, track_url};
    use tempfile::TempDir;

    fn options(dir: &TempDir, max_concurrent: usize) -> DownloadOptions {
        DownloadOptions {
            format: AudioFormat::Mp3,
            enhance_metadata: true,
            max_concurrent,
            use_extended_provider: false,
            item_timeout: None,
            job_timeout: None,
            download_dir: dir.path().join("out"),
            write_tags: true,
        }
    }

    fn aggregator(providers: Vec<Arc<dyn MetadataProvider>>) -> Arc<MetadataAggregator> {
        Arc::new(MetadataAggregator::new(providers, AggregatorConfig::default()))
    }

    fn bpm_provider() -> Arc<dyn MetadataProvider> {
        Arc::new(MockProvider::returning(
            ProviderId::GetSongBpm,
            PartialMetadata {
                bpm: Some(128.0),
                ..Default::default()
            },
        ))
    }

    fn downloader(
        resolver: MockResolver,
        downloader: Arc<MockDownloader>,
        converter: MockConverter,
        providers: Vec<Arc<dyn MetadataProvider>>,
    ) -> PlaylistDownloader {
        PlaylistDownloader::new(
            Arc::new(resolver),
            downloader,
            Arc::new(converter),
            aggregator(providers),
        )
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_job() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(5).failing_on(2),
            Arc::new(MockDownloader::with_random_delay(1, 10)),
            MockConverter::copying(),
            vec![bpm_provider()],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 2))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.total_tracks, 5);
        assert_eq!(report.processed_tracks, 5);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("video unavailable"));
        assert_eq!(report.items[2].status, TrackStatus::Failed);
        assert_eq!(
            report
                .items
                .iter()
                .filter(|i| i.status == TrackStatus::Completed)
                .count(),
            4
        );
    }

    #[tokio::test]
    async fn test_every_item_failing_still_processes_all() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(4),
            Arc::new(MockDownloader::instant()),
            MockConverter::failing(),
            vec![],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 3))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.processed_tracks, report.total_tracks);
        assert_eq!(report.errors.len(), 4);
        assert!(report.items.iter().all(|i| i.status == TrackStatus::Failed));
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        for max in [1, 3, 10] {
            let dir = tempfile::tempdir().unwrap();
            let mock_downloader = Arc::new(MockDownloader::with_random_delay(1, 15));
            let dl = downloader(
                MockResolver::with_tracks(20),
                mock_downloader.clone(),
                MockConverter::copying(),
                vec![],
            );

            let report = dl
                .download_playlist("https://example.com/playlist", &options(&dir, max))
                .await
                .unwrap();

            assert_eq!(report.processed_tracks, 20);
            assert!(report.peak_concurrency <= max, "peak {} > {}", report.peak_concurrency, max);
            assert!(mock_downloader.peak() <= max);
            assert_eq!(mock_downloader.calls(), 20);
        }
    }

    #[tokio::test]
    async fn test_completions_attributed_to_right_item() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(8),
            Arc::new(MockDownloader::with_random_delay(1, 20)),
            MockConverter::copying(),
            vec![],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 4))
            .await
            .unwrap();

        for (i, item) in report.items.iter().enumerate() {
            assert_eq!(item.index, i);
            assert_eq!(item.source, track_url(i));
            assert_eq!(item.title.as_deref(), Some(format!("Track {}", i).as_str()));
            let output = item.output_path.as_ref().unwrap();
            assert!(output.to_string_lossy().contains(&format!("Track {}", i)));
            assert!(output.exists());
        }
    }

    #[tokio::test]
    async fn test_enhanced_counts_contributing_items() {
        let dir = tempfile::tempdir().unwrap();
        // Only "Track 1" gets an answer
        let provider: Arc<dyn MetadataProvider> = Arc::new(MockProvider::with_responder(
            ProviderId::LastFm,
            |query| {
                if query.title == "Track 1" {
                    Ok(PartialMetadata {
                        genre: Some("House".to_string()),
                        ..Default::default()
                    })
                } else {
                    Err(ProviderError::NoMatches)
                }
            },
        ));
        let dl = downloader(
            MockResolver::with_tracks(4),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![provider],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 2))
            .await
            .unwrap();

        assert_eq!(report.enhanced_tracks, 1);
        assert_eq!(report.enhancement_rate, 25);
        assert_eq!(report.errors.len(), 0);
        let item = &report.items[1];
        assert_eq!(
            item.metadata.as_ref().and_then(|m| m.genre.as_deref()),
            Some("House")
        );
    }

    #[tokio::test]
    async fn test_enhancement_disabled_skips_providers() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::returning(
            ProviderId::GetSongBpm,
            PartialMetadata {
                bpm: Some(128.0),
                ..Default::default()
            },
        ));
        let shared: Arc<dyn MetadataProvider> = provider.clone();
        let dl = downloader(
            MockResolver::with_tracks(3),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![shared],
        );

        let mut opts = options(&dir, 2);
        opts.enhance_metadata = false;
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        assert_eq!(report.enhanced_tracks, 0);
        assert_eq!(report.enhancement_rate, 0);
        assert_eq!(provider.calls(), 0);
        assert!(report.items.iter().all(|i| i.metadata.is_none()));
    }

    #[tokio::test]
    async fn test_tags_written_to_converted_file() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(1),
            Arc::new(MockDownloader::instant()),
            MockConverter::writing_wav(),
            vec![bpm_provider()],
        );

        let mut opts = options(&dir, 1);
        opts.format = AudioFormat::Wav;
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        let output = report.items[0].output_path.clone().unwrap();
        assert_eq!(output.extension().and_then(|e| e.to_str()), Some("wav"));
        let tags = crate::metadata::read(&output).unwrap();
        assert_eq!(tags.title.as_deref(), Some("Track 0"));
        assert_eq!(tags.artist.as_deref(), Some("Mock Artist"));
    }

    #[tokio::test]
    async fn test_tag_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // The copying converter produces files lofty can't parse
        let dl = downloader(
            MockResolver::with_tracks(2),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![bpm_provider()],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 2))
            .await
            .unwrap();

        assert!(report.errors.is_empty());
        assert_eq!(report.enhanced_tracks, 2);
        assert_eq!(report.enhancement_rate, 100);
    }

    #[tokio::test]
    async fn test_raw_downloads_removed() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(3),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );

        let opts = options(&dir, 3);
        dl.download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(&opts.download_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| !n.starts_with("raw-")));
    }

    #[tokio::test]
    async fn test_duplicate_names_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let refs = vec![
            TrackRef::url("https://one.example.com/track7"),
            TrackRef::url("https://two.example.com/track7"),
        ];
        // Both resolve to the same title and artist
        let resolver = MockResolver::with_refs(refs);
        let dl = downloader(
            resolver,
            Arc::new(MockDownloader::with_random_delay(1, 5)),
            MockConverter::copying(),
            vec![],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 2))
            .await
            .unwrap();

        let a = report.items[0].output_path.clone().unwrap();
        let b = report.items[1].output_path.clone().unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        let names = [a, b].map(|p| p.file_name().unwrap().to_string_lossy().into_owned());
        assert!(names.contains(&"Mock Artist - Track 7.mp3".to_string()));
        assert!(names.contains(&"Mock Artist - Track 7 (2).mp3".to_string()));
    }

    #[tokio::test]
    async fn test_enumeration_failure_reports_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::failing_enumeration(),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 2))
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.total_tracks, 0);
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unusable_download_dir_reports_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let dl = downloader(
            MockResolver::with_tracks(2),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );
        let mut opts = options(&dir, 2);
        opts.download_dir = file.join("nested");

        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.errors[0].contains("download directory"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(1),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );

        let empty_url = dl.download_playlist("  ", &options(&dir, 2)).await;
        assert!(matches!(empty_url, Err(Error::Validation(_))));

        let zero = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 0))
            .await;
        assert!(matches!(zero, Err(Error::Validation(_))));

        let no_refs = dl.download_tracks(vec![], &options(&dir, 1)).await;
        assert!(matches!(no_refs, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_item_timeout_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(2).with_delay(Duration::from_millis(500)),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );

        let mut opts = options(&dir, 2);
        opts.item_timeout = Some(Duration::from_millis(20));
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.processed_tracks, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_item_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(2),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying().with_delay(Duration::from_secs(5)),
            vec![],
        );

        let mut opts = options(&dir, 2);
        opts.item_timeout = Some(Duration::from_millis(200));
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.contains("timed out")));
        let leftovers: Vec<_> = std::fs::read_dir(&opts.download_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_failed_conversion_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(2),
            Arc::new(MockDownloader::instant()),
            MockConverter::failing(),
            vec![],
        );

        let opts = options(&dir, 2);
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        assert_eq!(report.errors.len(), 2);
        assert_eq!(std::fs::read_dir(&opts.download_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_sees_converted_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider: Arc<dyn MetadataProvider> =
            Arc::new(MockProvider::with_responder(ProviderId::Analysis, |query| {
                let file = query.file.as_ref().ok_or(ProviderError::NoMatches)?;
                assert!(file.exists());
                assert_eq!(file.extension().and_then(|e| e.to_str()), Some("mp3"));
                Ok(PartialMetadata {
                    key: Some("A Minor".to_string()),
                    ..Default::default()
                })
            }));
        let dl = downloader(
            MockResolver::with_tracks(1),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![provider],
        );

        let report = dl
            .download_playlist("https://example.com/playlist", &options(&dir, 1))
            .await
            .unwrap();

        assert_eq!(report.enhanced_tracks, 1);
        let metadata = report.items[0].metadata.as_ref().unwrap();
        assert_eq!(metadata.key.as_deref(), Some("A Minor"));
    }

    #[tokio::test]
    async fn test_job_deadline_fails_pending_items() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(4).with_delay(Duration::from_millis(80)),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        );

        let mut opts = options(&dir, 1);
        opts.job_timeout = Some(Duration::from_millis(40));
        let report = dl
            .download_playlist("https://example.com/playlist", &opts)
            .await
            .unwrap();

        // The first track was already in flight and drains normally
        assert_eq!(report.items[0].status, TrackStatus::Completed);
        assert!(
            report.items[1..]
                .iter()
                .all(|i| i.status == TrackStatus::Failed)
        );
        assert_eq!(report.processed_tracks, 4);
        assert!(report.errors.iter().all(|e| e.contains("deadline")));
    }

    #[tokio::test]
    async fn test_download_tracks_search_pair() {
        let dir = tempfile::tempdir().unwrap();
        let dl = downloader(
            MockResolver::with_tracks(0),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![bpm_provider()],
        );

        let report = dl
            .download_tracks(
                vec![TrackRef::search("Levels", Some("Avicii"))],
                &options(&dir, 1),
            )
            .await
            .unwrap();

        assert_eq!(report.total_tracks, 1);
        let item = &report.items[0];
        assert_eq!(item.status, TrackStatus::Completed);
        assert!(
            item.output_path
                .as_ref()
                .unwrap()
                .ends_with("Avicii - Levels.mp3")
        );
        assert_eq!(item.metadata.as_ref().and_then(|m| m.bpm), Some(128.0));
    }

    #[tokio::test]
    async fn test_events_cover_every_transition() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let dl = downloader(
            MockResolver::with_tracks(2),
            Arc::new(MockDownloader::instant()),
            MockConverter::copying(),
            vec![],
        )
        .with_events(tx);

        dl.download_playlist("https://example.com/playlist", &options(&dir, 1))
            .await
            .unwrap();
        drop(dl);

        let mut statuses = Vec::new();
        let mut finished = false;
        while let Some(event) = rx.recv().await {
            match event {
                JobEvent::ItemUpdated(item) if item.index == 0 => statuses.push(item.status),
                JobEvent::ItemUpdated(_) => {}
                JobEvent::Finished {
                    processed_tracks, ..
                } => {
                    assert_eq!(processed_tracks, 2);
                    finished = true;
                }
            }
        }

        assert!(finished);
        assert_eq!(
            statuses,
            vec![
                TrackStatus::Resolving,
                TrackStatus::Downloading,
                TrackStatus::Converting,
                TrackStatus::Enriching,
                TrackStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let options = DownloadOptions::default();
        let report = DownloadReport::not_started(
            &options,
            Instant::now(),
            "playlist unavailable".to_string(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["totalTracks"], 0);
        assert_eq!(json["enhancementRate"], 0);
        assert!(json["finishedAt"].is_string());
        assert!(json["durationMs"].is_number());
    }

    #[test]
    fn test_enhancement_rate_rounds() {
        assert_eq!(enhancement_rate(0, 0), 0);
        assert_eq!(enhancement_rate(1, 3), 33);
        assert_eq!(enhancement_rate(2, 3), 67);
        assert_eq!(enhancement_rate(5, 5), 100);
    }
}
