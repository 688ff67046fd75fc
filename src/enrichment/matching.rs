//! Picking the best candidate when a catalog returns several hits.
//!
//! Catalog search endpoints return loosely ranked lists. We score each
//! candidate against the query's title and artist and keep the best one,
//! preferring earlier hits on ties so the catalog's own ranking still counts.

use crate::enrichment::domain::TrackQuery;

/// Lowercase, strip punctuation and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Score how well a candidate title/artist matches the query.
///
/// Exact (normalized) matches score highest, containment in either
/// direction scores partially, and anything else scores nothing.
pub fn match_score(query: &TrackQuery, title: Option<&str>, artist: Option<&str>) -> u32 {
    let mut score = 0;

    if let Some(title) = title {
        score += similarity(&query.title, title) * 2;
    }

    if let (Some(wanted), Some(artist)) = (query.artist.as_deref(), artist) {
        score += similarity(wanted, artist);
    }

    score
}

fn similarity(wanted: &str, candidate: &str) -> u32 {
    let wanted = normalize(wanted);
    let candidate = normalize(candidate);
    if wanted.is_empty() || candidate.is_empty() {
        return 0;
    }
    if wanted == candidate {
        2
    } else if candidate.contains(&wanted) || wanted.contains(&candidate) {
        1
    } else {
        0
    }
}

/// Return the best-scoring candidate, or the first one when none match.
pub fn pick_best<T, F>(query: &TrackQuery, candidates: Vec<T>, fields: F) -> Option<T>
where
    F: Fn(&T) -> (Option<&str>, Option<&str>),
{
    let mut best: Option<(u32, T)> = None;
    for candidate in candidates {
        let (title, artist) = fields(&candidate);
        let score = match_score(query, title, artist);
        if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
