//! Adapter layer: Convert Discogs DTOs to domain models

use super::dto;
use crate::enrichment::domain::{
    PartialMetadata, ProviderError, TrackQuery, non_blank, year_from_json,
};
use crate::enrichment::matching;

/// Convert a database search response into partial metadata
pub fn to_partial(
    response: dto::SearchResponse,
    query: &TrackQuery,
) -> Result<PartialMetadata, ProviderError> {
    let candidates: Vec<_> = response
        .results
        .into_iter()
        .map(|r| {
            let (artist, release) = split_title(&r.title);
            (artist, release, r)
        })
        .collect();

    let (_, release, result) = matching::pick_best(query, candidates, |(artist, release, _)| {
        (Some(release.as_str()), artist.as_deref())
    })
    .ok_or(ProviderError::NoMatches)?;

    // Styles are finer-grained than Discogs' handful of top-level genres
    let genre = result.style.first().or_else(|| result.genre.first());

    Ok(PartialMetadata {
        album: non_blank(Some(&release)),
        year: year_from_json(&result.year),
        genre: non_blank(genre.map(String::as_str)),
        label: non_blank(result.label.first().map(|l| strip_disambiguation(l))),
        ..Default::default()
    })
}

/// Split "Artist - Release" into its parts. Titles without a separator are
/// treated as release-only.
fn split_title(title: &str) -> (Option<String>, String) {
    match title.split_once(" - ") {
        Some((artist, release)) => (
            Some(strip_disambiguation(artist).to_string()),
            release.trim().to_string(),
        ),
        None => (None, title.trim().to_string()),
    }
}

/// Discogs appends " (2)" style suffixes to disambiguate identical names
fn strip_disambiguation(name: &str) -> &str {
    let trimmed = name.trim();
    if let Some(open) = trimmed.rfind(" (")
        && trimmed.ends_with(')')
        && trimmed[open + 2..trimmed.len() - 1]
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        return &trimmed[..open];
    }
    trimmed
}
