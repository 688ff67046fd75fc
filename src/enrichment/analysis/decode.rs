//! Decode an audio file to mono samples with symphonia.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::enrichment::domain::ProviderError;

/// Analysis works at roughly this rate; higher rates are decimated down.
const TARGET_SAMPLE_RATE: u32 = 22050;

/// Mono audio ready for analysis.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    /// Root mean square level of the whole signal.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let energy: f32 = self.samples.iter().map(|s| s * s).sum();
        (energy / self.samples.len() as f32).sqrt()
    }
}

/// Decode at most `max_seconds` of the first audio track, mixed to mono.
pub fn decode_mono(path: &Path, max_seconds: u32) -> Result<MonoAudio, ProviderError> {
    let file = File::open(path)
        .map_err(|e| ProviderError::Analysis(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(analysis_error)?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ProviderError::Analysis("No audio track found".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ProviderError::Analysis("Unknown sample rate".to_string()))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(analysis_error)?;

    let wanted = sample_rate as usize * max_seconds as usize;
    let mut mono = Vec::new();

    while mono.len() < wanted {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(analysis_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(_)) => continue, // Skip bad frame
            Err(e) => return Err(analysis_error(e)),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        mono.extend(
            buffer
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
    mono.truncate(wanted);

    Ok(decimate(mono, sample_rate))
}

/// Average blocks of samples down towards [`TARGET_SAMPLE_RATE`].
fn decimate(samples: Vec<f32>, sample_rate: u32) -> MonoAudio {
    let factor = (sample_rate / TARGET_SAMPLE_RATE).max(1) as usize;
    if factor == 1 {
        return MonoAudio {
            samples,
            sample_rate,
        };
    }

    MonoAudio {
        samples: samples
            .chunks(factor)
            .map(|block| block.iter().sum::<f32>() / block.len() as f32)
            .collect(),
        sample_rate: sample_rate / factor as u32,
    }
}

fn analysis_error(e: SymphoniaError) -> ProviderError {
    ProviderError::Analysis(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_silent_wav, write_wav};

    #[test]
    fn test_decode_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..22050)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin())
            .collect();
        write_wav(&path, 22050, &samples);

        let audio = decode_mono(&path, 300).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 22050);
        // A sine at amplitude 0.5 has an RMS of 0.5 / sqrt(2)
        assert!((audio.rms() - 0.3536).abs() < 0.01);
    }

    #[test]
    fn test_decode_stops_at_max_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        write_wav(&path, 8000, &vec![0.1; 8000 * 3]);

        let audio = decode_mono(&path, 1).unwrap();
        assert_eq!(audio.samples.len(), 8000);
    }

    #[test]
    fn test_silent_file_has_no_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.wav");
        write_silent_wav(&path);

        let audio = decode_mono(&path, 300).unwrap();
        assert!(!audio.samples.is_empty());
        assert_eq!(audio.rms(), 0.0);
    }

    #[test]
    fn test_non_audio_is_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not audio").unwrap();

        assert!(matches!(
            decode_mono(&path, 300),
            Err(ProviderError::Analysis(_))
        ));
        assert!(matches!(
            decode_mono(&dir.path().join("gone.wav"), 300),
            Err(ProviderError::Analysis(_))
        ));
    }

    #[test]
    fn test_decimate_halves_high_rates() {
        let audio = decimate(vec![1.0, 0.0, 0.5, 0.5], 44100);
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples, vec![0.5, 0.5]);
    }
}
