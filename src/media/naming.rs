//! Output file naming: `<Artist> - <Title>.<ext>`, made safe for every file system.

use std::path::{Path, PathBuf};

/// Longest stem we produce, in characters (leaves room for suffix and extension)
const MAX_STEM_CHARS: usize = 180;

/// Replace characters that are invalid in file names on any major OS
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect()
}

/// Build the file stem for a track
pub fn track_stem(artist: Option<&str>, title: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { "Unknown Title" } else { title };
    let raw = match artist.map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} - {}", artist, title),
        None => title.to_string(),
    };

    let stem: String = sanitize_filename(&raw).chars().take(MAX_STEM_CHARS).collect();
    // Windows strips trailing dots and spaces, which would break the collision check
    let stem = stem.trim_end_matches(['.', ' ']).trim_start();
    if stem.is_empty() {
        "Unknown Title".to_string()
    } else {
        stem.to_string()
    }
}

/// First free path for `stem.ext` in `dir`, appending " (2)", " (3)", ...
///
/// `is_taken` decides whether a candidate is in use (on disk or reserved).
pub fn unique_path<F>(dir: &Path, stem: &str, ext: &str, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let first = dir.join(format!("{}.{}", stem, ext));
    if !is_taken(&first) {
        return first;
    }

    (2u32..)
        .map(|n| dir.join(format!("{} ({}).{}", stem, n, ext)))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(first)
}
