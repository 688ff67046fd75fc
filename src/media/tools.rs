//! Discovery and invocation of the external command-line tools.
//!
//! Install them with:
//! - Windows: `winget install yt-dlp.yt-dlp Gyan.FFmpeg`
//! - macOS: `brew install yt-dlp ffmpeg`
//! - Linux: `apt install ffmpeg` and `pipx install yt-dlp` (distro yt-dlp packages go stale fast)

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use serde::Serialize;
use tokio::process::Command;

use super::MediaError;
use crate::config::ToolsConfig;

/// Common installation paths, tried after the configured path
#[cfg(windows)]
const EXTRA_DIRS: &[&str] = &[
    r"C:\Program Files\yt-dlp",
    r"C:\Program Files\ffmpeg\bin",
    r"C:\ProgramData\chocolatey\bin",
];

#[cfg(not(windows))]
const EXTRA_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

/// Availability of one external tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    /// The path that answered, or the configured one if none did
    pub path: PathBuf,
    pub available: bool,
    pub version: Option<String>,
}

/// Run a tool to completion, capturing its output.
///
/// The child is killed if the returned future is dropped (e.g. by a timeout).
pub async fn run<I, S>(program: &Path, args: I) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::ToolMissing(program.display().to_string()),
            _ => MediaError::Io(e),
        })
}

/// Last meaningful line of stderr, for error messages
pub fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("exited with {}", output.status))
}

/// Ask a tool for its version, returning the first line of output
pub async fn version(program: &Path, version_arg: &str) -> Option<String> {
    let output = run(program, [version_arg]).await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

/// Find a working executable: the configured path first, then common install dirs
pub async fn find(configured: &Path, version_arg: &str) -> Option<(PathBuf, String)> {
    for candidate in candidates(configured) {
        if let Some(v) = version(&candidate, version_arg).await {
            return Some((candidate, v));
        }
    }
    None
}

fn candidates(configured: &Path) -> Vec<PathBuf> {
    let mut paths = vec![configured.to_path_buf()];

    // Only bare names are worth looking up elsewhere
    if configured.components().count() == 1
        && let Some(name) = configured.file_name()
    {
        paths.extend(EXTRA_DIRS.iter().map(|dir| Path::new(dir).join(name)));
    }
    paths
}

/// Check yt-dlp and ffmpeg
pub async fn check_tools(tools: &ToolsConfig) -> Vec<ToolStatus> {
    let checks: [(&'static str, &Path, &str); 2] = [
        ("yt-dlp", tools.ytdlp_path.as_path(), "--version"),
        ("ffmpeg", tools.ffmpeg_path.as_path(), "-version"),
    ];

    let mut statuses = Vec::with_capacity(checks.len());
    for (name, configured, version_arg) in checks {
        let status = match find(configured, version_arg).await {
            Some((path, version)) => ToolStatus {
                name,
                path,
                available: true,
                version: Some(version),
            },
            None => ToolStatus {
                name,
                path: configured.to_path_buf(),
                available: false,
                version: None,
            },
        };
        statuses.push(status);
    }
    statuses
}
