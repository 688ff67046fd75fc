//! Metadata search and provider diagnostic commands.

use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::enrichment::{Metadata, MetadataAggregator, SearchOptions, TrackQuery};
use crate::error::{Error, ResultExt};

use super::{cli_error, print_json};

/// What to look up
#[derive(Debug, Clone, Copy)]
pub struct SearchArgs<'a> {
    pub title: &'a str,
    pub artist: Option<&'a str>,
    /// Local copy of the track for tempo and key analysis
    pub file: Option<&'a Path>,
    pub extended: bool,
    pub json: bool,
}

/// Search output: the merged record plus how long the lookup took
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchOutput {
    #[serde(flatten)]
    metadata: Metadata,
    search_duration_ms: u64,
}

/// Look up a track across every configured provider
pub fn cmd_search(rt: &Runtime, config: &Config, args: SearchArgs<'_>) -> anyhow::Result<()> {
    let query = build_query(&args).map_err(|e| cli_error("search", e))?;
    let aggregator = MetadataAggregator::from_config(config);
    let options = SearchOptions {
        use_extended_provider: args.extended || config.enrichment.use_extended_provider,
    };

    let started = Instant::now();
    let metadata = rt.block_on(aggregator.search(&query, &options));
    let output = SearchOutput {
        metadata,
        search_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    if args.json {
        return print_json(&output);
    }

    print_metadata(&output.metadata);
    println!();
    println!("Took {} ms", output.search_duration_ms);
    Ok(())
}

fn build_query(args: &SearchArgs<'_>) -> crate::error::Result<TrackQuery> {
    let query = TrackQuery::new(args.title, args.artist.unwrap_or_default())?;
    let Some(file) = args.file else {
        return Ok(query);
    };

    if !file.try_exists().with_context(format!("checking {}", file.display()))? {
        return Err(Error::validation(format!("no such file: {}", file.display())));
    }
    Ok(query.with_file(file))
}

fn print_metadata(metadata: &Metadata) {
    if metadata.has_contributions() {
        let sources: Vec<&str> = metadata.sources.iter().map(|s| s.as_str()).collect();
        println!("✓ Found metadata ({})", sources.join(", "));
    } else {
        println!("✗ No provider knew this track");
    }
    println!();

    let text_fields = [
        ("Title", &metadata.title),
        ("Artist", &metadata.artist),
        ("Album", &metadata.album),
        ("Genre", &metadata.genre),
        ("Label", &metadata.label),
        ("Key", &metadata.key),
        ("Released", &metadata.published_date),
    ];
    for (name, value) in text_fields {
        if let Some(value) = value {
            println!("  {:<9} {}", format!("{}:", name), value);
        }
    }
    if let Some(year) = metadata.year {
        println!("  Year:     {}", year);
    }
    if let Some(bpm) = metadata.bpm {
        println!("  BPM:      {}", bpm);
    }
    if let Some(duration) = metadata.duration {
        println!("  Length:   {}:{:02}", duration / 60, duration % 60);
    }
}

/// Show which providers can be queried
pub fn cmd_providers(config: &Config, json: bool) -> anyhow::Result<()> {
    let status = MetadataAggregator::from_config(config).configuration_status();
    if json {
        return print_json(&status);
    }

    println!("Metadata providers:\n");
    for (id, configured) in &status.providers {
        if *configured {
            println!("✓ {}", id);
        } else {
            println!("✗ {}: not configured", id);
        }
    }
    println!();
    println!("{}/{} configured", status.configured, status.total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::ProviderId;
    use smallvec::smallvec;

    fn args(title: &str) -> SearchArgs<'_> {
        SearchArgs {
            title,
            artist: Some("Avicii"),
            file: None,
            extended: false,
            json: true,
        }
    }

    #[test]
    fn test_blank_title_is_bad_input() {
        let err = build_query(&args("  ")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_file_is_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.mp3");
        let err = build_query(&SearchArgs {
            file: Some(&missing),
            ..args("Levels")
        })
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("gone.mp3"));
    }

    #[test]
    fn test_file_attached_to_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.wav");
        crate::test_utils::write_silent_wav(&path);

        let query = build_query(&SearchArgs {
            file: Some(&path),
            ..args("Levels")
        })
        .unwrap();
        assert_eq!(query.file.as_deref(), Some(path.as_path()));
        assert_eq!(query.artist.as_deref(), Some("Avicii"));
    }

    #[test]
    fn test_search_output_flattens_metadata() {
        let output = SearchOutput {
            metadata: Metadata {
                title: Some("Levels".to_string()),
                bpm: Some(126.0),
                sources: smallvec![ProviderId::GetSongBpm],
                ..Default::default()
            },
            search_duration_ms: 42,
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["title"], "Levels");
        assert_eq!(json["bpm"], 126.0);
        assert_eq!(json["sources"][0], "getsongbpm");
        assert_eq!(json["searchDurationMs"], 42);
    }
}
