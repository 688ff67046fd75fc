//! Read path for downloaded tracks: an async handle plus what to call its bytes.

use std::path::Path;

use tokio::fs::File;

use super::MediaError;

/// An opened track ready to be streamed
#[derive(Debug)]
pub struct TrackFile {
    pub file: File,
    pub len: u64,
    pub content_type: &'static str,
}

/// MIME type for an audio file, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("m4a") | Some("aac") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// Open a track for reading
pub async fn open_track(path: &Path) -> Result<TrackFile, MediaError> {
    let file = File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MediaError::NotFound(path.to_path_buf()),
        _ => MediaError::Io(e),
    })?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }

    Ok(TrackFile {
        file,
        len: metadata.len(),
        content_type: content_type_for(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("a.FLAC")), "audio/flac");
        assert_eq!(content_type_for(Path::new("a.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("a.txt")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_open_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Avicii - Levels.mp3");
        std::fs::write(&path, b"ID3fake").unwrap();

        let mut track = open_track(&path).await.unwrap();
        assert_eq!(track.len, 7);
        assert_eq!(track.content_type, "audio/mpeg");

        let mut bytes = Vec::new();
        track.file.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes, b"ID3fake");
    }

    #[tokio::test]
    async fn test_open_missing_track() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_track(&dir.path().join("missing.mp3")).await;
        assert!(matches!(result, Err(MediaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_track(dir.path()).await;
        assert!(result.is_err());
    }
}
