//! ffmpeg-based format conversion.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::traits::Converter;
use super::{AudioFormat, MediaError, tools};

/// ffmpeg wrapper
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Encoder arguments per output format
fn codec_args(format: AudioFormat) -> &'static [&'static str] {
    match format {
        // V0 VBR
        AudioFormat::Mp3 => &["-codec:a", "libmp3lame", "-q:a", "0"],
        AudioFormat::Flac => &["-codec:a", "flac"],
        AudioFormat::Wav => &["-codec:a", "pcm_s16le"],
    }
}

fn build_args(input: &Path, format: AudioFormat, target: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_owned());

    // Drop video streams (cover frames) and whatever tags the source carried
    args.extend(["-vn", "-map_metadata", "-1"].into_iter().map(OsString::from));
    args.extend(codec_args(format).iter().map(OsString::from));
    args.push(target.as_os_str().to_owned());
    args
}

#[async_trait]
impl Converter for Ffmpeg {
    async fn convert(
        &self,
        input: &Path,
        format: AudioFormat,
        target: &Path,
    ) -> Result<PathBuf, MediaError> {
        let output = tools::run(&self.program, build_args(input, format, target)).await?;
        if !output.status.success() {
            return Err(MediaError::Conversion(tools::stderr_summary(&output)));
        }

        if !tokio::fs::try_exists(target).await.unwrap_or(false) {
            return Err(MediaError::Conversion(format!(
                "ffmpeg produced no output at {:?}",
                target
            )));
        }
        Ok(target.to_path_buf())
    }
}
