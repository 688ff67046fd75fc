//! Adapter layer: pull tracks out of the search page and convert the best one

use scraper::{Html, Selector};
use serde_json::Value;

use super::dto;
use crate::enrichment::domain::{
    PartialMetadata, ProviderError, TrackQuery, bpm_from_json, non_blank, normalize_key,
    parse_year,
};
use crate::enrichment::matching;

/// Extract the embedded `__NEXT_DATA__` JSON from a search results page
pub fn extract_page_state(html: &str) -> Result<Value, ProviderError> {
    let selector = Selector::parse("script#__NEXT_DATA__")
        .map_err(|e| ProviderError::Parse(format!("bad page state selector: {}", e)))?;

    let document = Html::parse_document(html);
    let script = document
        .select(&selector)
        .next()
        .ok_or_else(|| ProviderError::Parse("page state script not found".to_string()))?;

    let body: String = script.text().collect();
    serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Convert a page state blob into partial metadata for the best matching track
pub fn to_partial(state: &Value, query: &TrackQuery) -> Result<PartialMetadata, ProviderError> {
    let tracks: Vec<dto::Track> = track_values(state)
        .into_iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();

    let candidates: Vec<_> = tracks
        .into_iter()
        .map(|t| (artist_string(&t.artists), t))
        .collect();

    let (artist, track) = matching::pick_best(query, candidates, |(artist, t)| {
        (t.track_name.as_deref(), artist.as_deref())
    })
    .ok_or(ProviderError::NoMatches)?;

    Ok(PartialMetadata {
        title: track_title(&track),
        artist,
        album: non_blank(track.release.as_ref().and_then(|r| r.release_name.as_deref())),
        year: track.publish_date.as_deref().and_then(parse_year),
        genre: genre_name(&track.genre),
        label: non_blank(track.label.as_ref().and_then(|l| l.label_name.as_deref())),
        bpm: bpm_from_json(&track.bpm),
        key: track.key_name.as_deref().and_then(normalize_key),
        duration: track
            .length
            .and_then(|ms| u32::try_from(ms / 1000).ok())
            .filter(|s| *s > 0),
        published_date: non_blank(track.publish_date.as_deref()),
    })
}

/// Track arrays live under `props.pageProps.dehydratedState.queries[].state.data`,
/// either directly as `data` or nested as `tracks.data` depending on the page.
fn track_values(state: &Value) -> Vec<&Value> {
    let queries = state
        .pointer("/props/pageProps/dehydratedState/queries")
        .and_then(Value::as_array);

    let Some(queries) = queries else {
        return Vec::new();
    };

    queries
        .iter()
        .filter_map(|q| q.pointer("/state/data"))
        .filter_map(|data| {
            data.get("data")
                .or_else(|| data.pointer("/tracks/data"))
                .and_then(Value::as_array)
        })
        .flatten()
        .collect()
}

fn artist_string(artists: &[dto::Artist]) -> Option<String> {
    let names: Vec<&str> = artists
        .iter()
        .map(|a| a.artist_name.trim())
        .filter(|n| !n.is_empty())
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

/// "Original Mix" is the default and not worth appending to the title
fn track_title(track: &dto::Track) -> Option<String> {
    let name = non_blank(track.track_name.as_deref())?;
    match non_blank(track.mix_name.as_deref()) {
        Some(mix) if !mix.eq_ignore_ascii_case("original mix") => {
            Some(format!("{} ({})", name, mix))
        }
        _ => Some(name),
    }
}

fn genre_name(genre: &Value) -> Option<String> {
    match genre {
        Value::String(s) => non_blank(Some(s)),
        Value::Array(items) => items
            .iter()
            .find_map(|g| g.get("genre_name").and_then(Value::as_str))
            .and_then(|s| non_blank(Some(s))),
        Value::Object(_) => non_blank(genre.get("genre_name").and_then(Value::as_str)),
        _ => None,
    }
}
