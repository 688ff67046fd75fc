//! Adapter layer: Convert GetSongBPM DTOs to domain models
//!
//! This is the ONLY place where GetSongBPM DTO types are converted to domain types.

use super::dto;
use crate::enrichment::domain::{
    PartialMetadata, ProviderError, TrackQuery, bpm_from_json, non_blank, normalize_key,
    title_case, year_from_json,
};
use crate::enrichment::matching;

/// Convert a search response into partial metadata for the best matching song
pub fn to_partial(
    response: dto::SearchResponse,
    query: &TrackQuery,
) -> Result<PartialMetadata, ProviderError> {
    if let Some(error) = response.error {
        return Err(classify_error(&error));
    }

    let songs = match response.search {
        Some(dto::SearchPayload::Songs(songs)) => songs,
        Some(dto::SearchPayload::Error { .. }) | None => return Err(ProviderError::NoMatches),
    };

    let song = matching::pick_best(query, songs, |s| {
        (Some(s.title.as_str()), s.artist.as_ref().map(|a| a.name.as_str()))
    })
    .ok_or(ProviderError::NoMatches)?;

    let genre = song
        .artist
        .as_ref()
        .and_then(|a| a.genres.first())
        .map(|g| title_case(g));

    Ok(PartialMetadata {
        title: non_blank(Some(&song.title)),
        artist: non_blank(song.artist.as_ref().map(|a| a.name.as_str())),
        album: non_blank(song.album.as_ref().and_then(|a| a.title.as_deref())),
        year: song.album.as_ref().and_then(|a| year_from_json(&a.year)),
        genre: non_blank(genre.as_deref()),
        bpm: bpm_from_json(&song.tempo),
        key: song.key_of.as_deref().and_then(normalize_key),
        ..Default::default()
    })
}

/// Request-level errors are almost always about the API key
fn classify_error(message: &str) -> ProviderError {
    let lower = message.to_lowercase();
    if lower.contains("key") || lower.contains("auth") {
        ProviderError::Auth(message.to_string())
    } else if lower.contains("limit") {
        ProviderError::RateLimited
    } else {
        ProviderError::Parse(message.to_string())
    }
}
