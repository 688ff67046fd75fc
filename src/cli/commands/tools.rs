//! Setup and inspection commands.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::error::{Error, ResultExt};
use crate::media::{files, tools};
use crate::metadata::{self, TrackTags};

use super::print_json;

/// Check that yt-dlp and ffmpeg can be run
pub fn cmd_check_tools(rt: &Runtime, config: &Config, json: bool) -> anyhow::Result<()> {
    let statuses = rt.block_on(tools::check_tools(&config.tools));
    if json {
        return print_json(&statuses);
    }

    println!("Checking download tools...\n");
    for status in &statuses {
        match status.version {
            Some(ref version) if status.available => {
                println!("✓ {}: {} ({})", status.name, version, status.path.display());
            }
            _ => {
                println!("✗ {}: NOT FOUND", status.name);
                print_install_instructions(status.name);
            }
        }
    }

    if statuses.iter().any(|s| !s.available) {
        anyhow::bail!("Required tools are missing");
    }
    Ok(())
}

fn print_install_instructions(tool: &str) {
    match tool {
        "yt-dlp" => {
            eprintln!("  Windows: winget install yt-dlp.yt-dlp");
            eprintln!("  macOS:   brew install yt-dlp");
            eprintln!("  Linux:   pipx install yt-dlp");
        }
        "ffmpeg" => {
            eprintln!("  Windows: winget install Gyan.FFmpeg");
            eprintln!("  macOS:   brew install ffmpeg");
            eprintln!("  Linux:   apt install ffmpeg");
        }
        _ => {}
    }
}

/// What `inspect` reports about a file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Inspection {
    path: PathBuf,
    content_type: &'static str,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<TrackTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_error: Option<String>,
}

/// Show content type, size and embedded tags of a local file
pub fn cmd_inspect(rt: &Runtime, path: &Path, json: bool) -> anyhow::Result<()> {
    let inspection = rt.block_on(inspect(path))?;
    if json {
        return print_json(&inspection);
    }

    println!("File:         {}", inspection.path.display());
    println!("Content type: {}", inspection.content_type);
    println!("Size:         {} bytes", inspection.size);

    match (&inspection.tags, &inspection.tag_error) {
        (Some(tags), _) => {
            println!();
            print_tags(tags);
        }
        (None, Some(e)) => println!("Tags:         unreadable ({})", e),
        (None, None) => {}
    }
    Ok(())
}

async fn inspect(path: &Path) -> crate::error::Result<Inspection> {
    let track = files::open_track(path)
        .await
        .with_context(format!("inspecting {}", path.display()))?;

    let tag_path = path.to_path_buf();
    let (tags, tag_error) = match tokio::task::spawn_blocking(move || metadata::read(&tag_path))
        .await
        .map_err(std::io::Error::from)?
    {
        Ok(tags) => (Some(tags), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Ok(Inspection {
        path: path.to_path_buf(),
        content_type: track.content_type,
        size: track.len,
        tags,
        tag_error,
    })
}

fn print_tags(tags: &TrackTags) {
    let text_fields = [
        ("Title", &tags.title),
        ("Artist", &tags.artist),
        ("Album", &tags.album),
        ("Genre", &tags.genre),
        ("Label", &tags.label),
        ("Key", &tags.key),
    ];
    for (name, value) in text_fields {
        if let Some(value) = value {
            println!("  {:<9} {}", format!("{}:", name), value);
        }
    }
    if let Some(year) = tags.year {
        println!("  Year:     {}", year);
    }
    if let Some(bpm) = tags.bpm {
        println!("  BPM:      {}", bpm);
    }
    println!("  Length:   {}:{:02}", tags.duration / 60, tags.duration % 60);
}

/// Write the default config file, to `path` or the platform config dir
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path().ok_or(config::ConfigError::NoConfigDir)?,
    };

    let exists = target
        .try_exists()
        .with_context(format!("checking {}", target.display()))?;
    if exists && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            target.display()
        );
    }

    let written = match path {
        Some(path) => config::save_to(&Config::default(), path).map(|()| path.to_path_buf()),
        None => config::save(&Config::default()),
    }
    .map_err(Error::from)
    .with_context("writing default config")?;

    println!("✓ Wrote default config to {}", written.display());
    Ok(())
}
