//! Adapter layer: Convert MusicBrainz DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! This isolates API changes - if MusicBrainz changes their response format,
//! only this file and dto.rs need to change.

use super::dto;
use crate::enrichment::domain::{
    PartialMetadata, ProviderError, TrackQuery, non_blank, parse_year, title_case,
};
use crate::enrichment::matching;

/// Convert a recording search response to partial metadata for the best hit
pub fn to_partial(
    response: dto::SearchResponse,
    query: &TrackQuery,
) -> Result<PartialMetadata, ProviderError> {
    let candidates: Vec<_> = response
        .recordings
        .into_iter()
        .map(|r| (build_artist_string(&r.artist_credit), r))
        .collect();

    let (artist, recording) = matching::pick_best(query, candidates, |(artist, r)| {
        (Some(r.title.as_str()), artist.as_deref())
    })
    .ok_or(ProviderError::NoMatches)?;

    let release = pick_release(&recording.releases);

    // Prefer the recording's first release date; fall back to the chosen release
    let published_date = recording
        .first_release_date
        .clone()
        .or_else(|| release.and_then(|r| r.date.clone()));

    Ok(PartialMetadata {
        title: non_blank(Some(&recording.title)),
        artist,
        album: non_blank(release.map(|r| r.title.as_str())),
        year: published_date.as_deref().and_then(parse_year),
        genre: extract_genre(&recording.tags),
        duration: recording
            .length
            .and_then(|ms| u32::try_from(ms / 1000).ok())
            .filter(|s| *s > 0),
        published_date: non_blank(published_date.as_deref()),
        ..Default::default()
    })
}

/// Build a combined artist string from artist credits
fn build_artist_string(credits: &[dto::ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }

    let mut result = String::new();
    for credit in credits {
        // Use credited name if available, otherwise official name
        let name = credit.name.as_ref().unwrap_or(&credit.artist.name);
        result.push_str(name);

        // Add join phrase if present (e.g., " & ", " feat. ")
        if let Some(ref join) = credit.joinphrase {
            result.push_str(join);
        }
    }

    non_blank(Some(&result))
}

/// Prefer official albums, then any official release, then whatever is first
fn pick_release(releases: &[dto::Release]) -> Option<&dto::Release> {
    releases
        .iter()
        .find(|r| {
            r.status.as_deref() == Some("Official")
                && r.release_group
                    .as_ref()
                    .and_then(|rg| rg.primary_type.as_deref())
                    == Some("Album")
        })
        .or_else(|| {
            releases
                .iter()
                .find(|r| r.status.as_deref() == Some("Official"))
        })
        .or_else(|| releases.first())
}

/// Most-voted tag with positive votes, title-cased
fn extract_genre(tags: &[dto::Tag]) -> Option<String> {
    tags.iter()
        .filter(|t| t.count > 0)
        .max_by_key(|t| t.count)
        .map(|t| title_case(&t.name))
}
