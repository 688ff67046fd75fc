//! Adapter layer: Convert Last.fm DTOs to domain models

use super::dto;
use crate::enrichment::domain::{PartialMetadata, ProviderError, non_blank, title_case};

/// Tags that describe listening habits rather than genre
const NON_GENRE_TAGS: &[&str] = &["seen live", "favorites", "favourite", "love", "awesome"];

/// Convert a `track.getInfo` response to partial metadata
pub fn to_partial(response: dto::TrackInfoResponse) -> Result<PartialMetadata, ProviderError> {
    if let Some(code) = response.error {
        return Err(classify_error(code, response.message.as_deref().unwrap_or("")));
    }

    let track = response.track.ok_or(ProviderError::NoMatches)?;

    let genre = track
        .toptags
        .map(|t| t.tag.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.name)
        .find(|name| !NON_GENRE_TAGS.contains(&name.to_lowercase().as_str()))
        .map(|name| title_case(&name));

    Ok(PartialMetadata {
        title: non_blank(Some(&track.name)),
        artist: non_blank(track.artist.as_ref().map(|a| a.name.as_str())),
        album: non_blank(track.album.as_ref().and_then(|a| a.title.as_deref())),
        genre: non_blank(genre.as_deref()),
        duration: duration_secs(&track.duration),
        published_date: non_blank(track.wiki.as_ref().and_then(|w| w.published.as_deref())),
        ..Default::default()
    })
}

/// Map Last.fm error codes onto the provider taxonomy.
///
/// See https://www.last.fm/api/errorcodes
pub fn classify_error(code: i32, message: &str) -> ProviderError {
    match code {
        6 => ProviderError::NoMatches,
        4 | 9 | 10 | 14 | 26 => ProviderError::Auth(message.to_string()),
        29 => ProviderError::RateLimited,
        _ => ProviderError::Network(format!("Last.fm error {}: {}", code, message)),
    }
}

/// Durations arrive as millisecond strings; "0" means unknown
fn duration_secs(value: &serde_json::Value) -> Option<u32> {
    let millis = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(millis / 1000).ok().filter(|s| *s > 0)
}
