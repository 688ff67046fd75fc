//! Audio file tag reading and writing.
//!
//! Uses the lofty crate for format-independent metadata access.
//! Supports MP3 (ID3v2), FLAC (Vorbis comments) and WAV (ID3v2 chunk).
//!
//! # Features
//! - Write aggregated metadata into converted downloads
//! - Read tags back for `inspect`

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use serde::Serialize;
use std::path::Path;

use crate::enrichment::domain::{Metadata, parse_bpm};
use crate::error::{Error, Result};

/// Tags as found in a file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    /// Seconds, from the audio properties
    pub duration: u64,
}

pub fn read(path: &Path) -> Result<TrackTags> {
    // Probe the file to determine format and read tags
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for probing: {}", e)))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file metadata: {}", e)))?;

    let duration = tagged_file.properties().duration().as_secs();

    // Get the primary tag, or fall back to the first available tag
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(TrackTags {
            duration,
            ..Default::default()
        });
    };

    Ok(TrackTags {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        year: tag.year(),
        genre: tag.genre().map(|s| s.to_string()),
        label: tag.get_string(&ItemKey::Label).map(str::to_string),
        bpm: tag.get_string(&ItemKey::Bpm).and_then(parse_bpm),
        key: tag.get_string(&ItemKey::InitialKey).map(str::to_string),
        duration,
    })
}

/// Write aggregated metadata into an audio file's tags
///
/// Only fields the metadata actually has are written; existing tags for the
/// other fields are left alone. Returns the number of fields written.
pub fn write(path: &Path, metadata: &Metadata) -> Result<usize> {
    // Read the existing file
    let mut tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for writing: {}", e)))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file for tag writing: {}", e)))?;

    // Get the primary tag type for this format, or create one
    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| Error::metadata(path, "File format does not accept tags"))?;

    let mut fields_written = 0;

    if let Some(ref title) = metadata.title {
        tag.set_title(title.clone());
        fields_written += 1;
    }
    if let Some(ref artist) = metadata.artist {
        tag.set_artist(artist.clone());
        fields_written += 1;
    }
    if let Some(ref album) = metadata.album {
        tag.set_album(album.clone());
        fields_written += 1;
    }
    if let Some(year) = metadata.year.and_then(|y| u32::try_from(y).ok()) {
        tag.set_year(year);
        fields_written += 1;
    }
    if let Some(ref genre) = metadata.genre {
        tag.set_genre(genre.clone());
        fields_written += 1;
    }

    // Not every tag format has these; insert_text reports whether it stuck
    if let Some(ref label) = metadata.label
        && tag.insert_text(ItemKey::Label, label.clone())
    {
        fields_written += 1;
    }
    if let Some(bpm) = metadata.bpm
        && tag.insert_text(ItemKey::Bpm, format_bpm(bpm))
    {
        fields_written += 1;
    }
    if let Some(ref key) = metadata.key
        && tag.insert_text(ItemKey::InitialKey, key.clone())
    {
        fields_written += 1;
    }

    // Save the file
    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| Error::metadata(path, format!("Failed to write tags to file: {}", e)))?;

    Ok(fields_written)
}

/// BPM tags are conventionally whole numbers
fn format_bpm(bpm: f64) -> String {
    format!("{}", bpm.round() as u32)
}
