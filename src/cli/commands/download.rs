//! Playlist and single-track download commands.

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::download::{DownloadReport, JobEvent, PlaylistDownloader, TrackStatus};
use crate::media::TrackRef;

use super::{DownloadArgs, cli_error, print_json};

/// Download every track of a playlist
pub fn cmd_download(
    rt: &Runtime,
    config: &Config,
    url: &str,
    args: &DownloadArgs,
) -> anyhow::Result<()> {
    let options = args.to_options(config);
    if !args.json {
        println!("Downloading: {}", url);
        println!("Output:      {}", options.download_dir.display());
        println!();
    }

    let report = rt.block_on(async {
        let (downloader, progress) = downloader_with_progress(config, args.json);
        let report = downloader.download_playlist(url, &options).await;
        drop(downloader);
        if let Some(progress) = progress {
            let _ = progress.await;
        }
        report
    })
    .map_err(|e| cli_error("download", e))?;

    finish(&report, args.json)
}

/// Search for one track and download it
pub fn cmd_get(
    rt: &Runtime,
    config: &Config,
    title: &str,
    artist: Option<&str>,
    args: &DownloadArgs,
) -> anyhow::Result<()> {
    let options = args.to_options(config);
    let reference = TrackRef::search(title, artist);
    if !args.json {
        println!("Searching: {}", reference);
        println!("Output:    {}", options.download_dir.display());
        println!();
    }

    let report = rt.block_on(async {
        let (downloader, progress) = downloader_with_progress(config, args.json);
        let report = downloader.download_tracks(vec![reference], &options).await;
        drop(downloader);
        if let Some(progress) = progress {
            let _ = progress.await;
        }
        report
    })
    .map_err(|e| cli_error("get", e))?;

    finish(&report, args.json)
}

/// A downloader plus, in text mode, a task printing each finished track.
/// The task ends once the downloader (and its sender) is dropped.
fn downloader_with_progress(
    config: &Config,
    json: bool,
) -> (PlaylistDownloader, Option<tokio::task::JoinHandle<()>>) {
    let downloader = PlaylistDownloader::from_config(config);
    if json {
        return (downloader, None);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        let mut done = 0usize;
        while let Some(event) = rx.recv().await {
            let JobEvent::ItemUpdated(item) = event else {
                continue;
            };
            match item.status {
                TrackStatus::Completed => {
                    done += 1;
                    let enhanced = item
                        .metadata
                        .as_ref()
                        .is_some_and(|m| m.has_contributions());
                    println!(
                        "[{}] ✓ {}{}",
                        done,
                        item.label(),
                        if enhanced { " (metadata found)" } else { "" }
                    );
                }
                TrackStatus::Failed => {
                    done += 1;
                    println!(
                        "[{}] ✗ {}: {}",
                        done,
                        item.label(),
                        item.error.as_deref().unwrap_or("unknown error")
                    );
                }
                _ => {}
            }
        }
    });

    (downloader.with_events(tx), Some(progress))
}

fn finish(report: &DownloadReport, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(report)?;
    } else {
        print_summary(report);
    }

    if !report.success {
        anyhow::bail!(
            "Download did not start: {}",
            report.errors.first().map(String::as_str).unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_summary(report: &DownloadReport) {
    println!();
    println!("=== Download Summary ===");
    println!(
        "Processed: {}/{}",
        report.processed_tracks, report.total_tracks
    );
    println!(
        "Enhanced:  {} ({}%)",
        report.enhanced_tracks, report.enhancement_rate
    );
    println!("Errors:    {}", report.errors.len());
    println!("Saved to:  {}", report.download_path.display());
    println!("Took:      {:.1}s", report.duration_ms as f64 / 1000.0);

    if !report.errors.is_empty() {
        println!();
        for error in &report.errors {
            println!("  ✗ {}", error);
        }
    }
}
