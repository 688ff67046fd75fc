//! yt-dlp integration: playlist enumeration, track resolution and download.
//!
//! Every call is a separate yt-dlp process with JSON output. Processes are
//! killed when their future is dropped, so item timeouts don't leak children.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{MediaDownloader, MediaResolver};
use super::{MediaError, ResolvedTrack, TrackRef, dedupe_refs, short_hash, tools};

/// yt-dlp wrapper
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn dump_json(&self, target: &str, args: &[&str]) -> Result<String, MediaError> {
        let output = tools::run(&self.program, args.iter().copied().chain([target])).await?;
        if !output.status.success() {
            return Err(MediaError::resolution(target, tools::stderr_summary(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    async fn enumerate(&self, url: &str) -> Result<Vec<TrackRef>, MediaError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MediaError::resolution(url, "empty URL"));
        }

        let json = self
            .dump_json(url, &["--flat-playlist", "--dump-single-json", "--no-warnings"])
            .await?;
        let refs = parse_listing(&json, url)?;
        tracing::debug!("Enumerated {} track(s) from {}", refs.len(), url);
        Ok(refs)
    }

    async fn resolve(&self, reference: &TrackRef) -> Result<ResolvedTrack, MediaError> {
        let target = match reference {
            TrackRef::Url(url) => url.clone(),
            TrackRef::Search { .. } => format!("ytsearch1:{}", reference),
        };

        let json = self
            .dump_json(
                &target,
                &["--dump-json", "--no-playlist", "--no-warnings", "--skip-download"],
            )
            .await?;

        let line = json
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| MediaError::resolution(reference, "no results"))?;
        let info: VideoInfo = serde_json::from_str(line)
            .map_err(|e| MediaError::resolution(reference, format!("bad yt-dlp output: {}", e)))?;

        Ok(to_resolved(info, reference))
    }
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn download(&self, track: &ResolvedTrack, dir: &Path) -> Result<PathBuf, MediaError> {
        // Raw names only need to be unique per source; the final name comes later
        let template = dir.join(format!("raw-{}.%(ext)s", short_hash(&track.download_ref)));

        let args: Vec<OsString> = vec![
            "-f".into(),
            "bestaudio/best".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--no-progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            template.into_os_string(),
            track.download_ref.clone().into(),
        ];

        let output = tools::run(&self.program, args).await?;
        if !output.status.success() {
            return Err(MediaError::Download(tools::stderr_summary(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| MediaError::Download("yt-dlp did not report a file".to_string()))?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MediaError::Download(format!(
                "yt-dlp reported {:?} but it does not exist",
                path
            )));
        }
        Ok(path)
    }
}

// ============================================================================
// yt-dlp JSON output
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    id: Option<String>,
    title: Option<String>,
    /// Music metadata, present for auto-generated "Topic" uploads
    track: Option<String>,
    artist: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
    #[serde(default)]
    entries: Vec<Option<Entry>>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    ie_key: Option<String>,
}

impl Entry {
    fn into_url(self) -> Option<String> {
        self.webpage_url
            .or(self.url)
            .filter(|u| u.starts_with("http"))
            .or_else(|| match (self.ie_key.as_deref(), self.id) {
                (Some("Youtube"), Some(id)) => Some(format!("https://www.youtube.com/watch?v={}", id)),
                _ => None,
            })
    }
}

/// Parse `--flat-playlist --dump-single-json` output
fn parse_listing(json: &str, url: &str) -> Result<Vec<TrackRef>, MediaError> {
    let info: VideoInfo = serde_json::from_str(json.trim())
        .map_err(|e| MediaError::resolution(url, format!("bad yt-dlp output: {}", e)))?;

    if info.kind.as_deref() != Some("playlist") {
        return Ok(vec![TrackRef::url(url)]);
    }

    let refs: Vec<TrackRef> = info
        .entries
        .into_iter()
        .flatten()
        .filter_map(Entry::into_url)
        .map(TrackRef::url)
        .collect();

    Ok(dedupe_refs(refs))
}

fn to_resolved(info: VideoInfo, reference: &TrackRef) -> ResolvedTrack {
    let (guessed_title, guessed_artist) = guess_title_artist(&info);

    // A search pair already says what the track is
    let (title, artist) = match reference {
        TrackRef::Search { title, artist } => {
            (title.clone(), artist.clone().or(guessed_artist))
        }
        TrackRef::Url(_) => (guessed_title, guessed_artist),
    };

    let download_ref = info
        .webpage_url
        .clone()
        .or_else(|| {
            info.id
                .as_ref()
                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        })
        .unwrap_or_else(|| reference.to_string());

    ResolvedTrack {
        download_ref,
        title,
        artist,
        duration_hint: info
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u32),
    }
}

// ============================================================================
// Title/artist guessing
// ============================================================================

/// Bracketed segments containing any of these words are dropped from titles
const DECORATION_WORDS: &[&str] = &[
    "official", "lyrics", "lyric", "audio", "video", "visualizer", "visualiser", "hd", "hq", "4k",
];

/// Best guess at (title, artist) from what the platform reports
fn guess_title_artist(info: &VideoInfo) -> (String, Option<String>) {
    let track = clean(info.track.as_deref());
    let artist = clean(info.artist.as_deref());
    if let (Some(track), Some(artist)) = (track.clone(), artist.clone()) {
        return (track, Some(artist));
    }

    let title = strip_decorations(info.title.as_deref().unwrap_or_default());
    if let Some((split_artist, split_title)) = split_artist_title(&title) {
        return (track.unwrap_or(split_title), Some(artist.unwrap_or(split_artist)));
    }

    let uploader = artist.or_else(|| {
        clean(info.uploader.as_deref().or(info.channel.as_deref())).map(|u| strip_topic(&u))
    });
    let title = track.unwrap_or(if title.is_empty() {
        info.id.clone().unwrap_or_else(|| "Unknown Title".to_string())
    } else {
        title
    });
    (title, uploader)
}

/// Remove "(Official Video)", "[Lyrics]" and similar from a title
fn strip_decorations(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut rest = title;

    while let Some(open) = rest.find(['(', '[']) {
        let closer = if rest[open..].starts_with('(') { ')' } else { ']' };
        let Some(len) = rest[open + 1..].find(closer) else {
            break;
        };
        let inner = &rest[open + 1..open + 1 + len];
        let end = open + 1 + len + 1;

        out.push_str(&rest[..open]);
        if !is_decoration(inner) {
            out.push_str(&rest[open..end]);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_decoration(inner: &str) -> bool {
    inner
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| DECORATION_WORDS.contains(&w.to_lowercase().as_str()))
}

/// Split "Artist - Title" video titles
fn split_artist_title(title: &str) -> Option<(String, String)> {
    [" - ", " – ", " — "].iter().find_map(|sep| {
        let (artist, track) = title.split_once(sep)?;
        let artist = artist.trim();
        let track = track.trim();
        (!artist.is_empty() && !track.is_empty()).then(|| (artist.to_string(), track.to_string()))
    })
}

/// "Avicii - Topic" channels are auto-generated artist channels
fn strip_topic(uploader: &str) -> String {
    uploader.trim_end_matches(" - Topic").trim().to_string()
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
