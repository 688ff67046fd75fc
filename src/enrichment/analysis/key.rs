//! Key estimation: a chroma vector correlated against the Krumhansl-Kessler
//! major and minor key profiles in all twelve transpositions.

use super::decode::MonoAudio;
use super::spectrum::Stft;
use crate::enrichment::domain::ProviderError;

const FRAME_LEN: usize = 8192;
const HOP: usize = 4096;

/// Bins outside this range carry more noise and rumble than pitch
const MIN_FREQ: f32 = 55.0;
const MAX_FREQ: f32 = 2000.0;

const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Estimate the key as "A Minor" / "C# Major". `None` for pitchless audio.
pub fn estimate_key(audio: &MonoAudio) -> Result<Option<String>, ProviderError> {
    let chroma = chroma(audio)?;
    Ok(key_from_chroma(&chroma))
}

/// Spectral energy per pitch class, C first.
fn chroma(audio: &MonoAudio) -> Result<[f64; 12], ProviderError> {
    let mut stft = Stft::new(FRAME_LEN, HOP);
    let bin_hz = stft.bin_hz(audio.sample_rate);
    let classes: Vec<Option<usize>> = (0..stft.bins())
        .map(|bin| pitch_class(bin as f32 * bin_hz))
        .collect();

    let mut chroma = [0.0f64; 12];
    stft.for_each_frame(&audio.samples, |magnitudes| {
        for (magnitude, class) in magnitudes.iter().zip(&classes) {
            if let Some(class) = class {
                chroma[*class] += *magnitude as f64;
            }
        }
    })?;
    Ok(chroma)
}

fn pitch_class(freq: f32) -> Option<usize> {
    if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
        return None;
    }
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(12) as usize)
}

fn key_from_chroma(chroma: &[f64; 12]) -> Option<String> {
    let mut best: Option<(f64, usize, &str)> = None;

    for tonic in 0..12 {
        let rotated: [f64; 12] = std::array::from_fn(|i| chroma[(tonic + i) % 12]);
        for (profile, mode) in [(&MAJOR_PROFILE, "Major"), (&MINOR_PROFILE, "Minor")] {
            let Some(r) = correlation(&rotated, profile) else {
                continue;
            };
            if best.is_none_or(|(score, _, _)| r > score) {
                best = Some((r, tonic, mode));
            }
        }
    }

    best.map(|(_, tonic, mode)| format!("{} {}", NOTE_NAMES[tonic], mode))
}

/// Pearson correlation; `None` when either side is flat.
fn correlation(a: &[f64; 12], b: &[f64; 12]) -> Option<f64> {
    let mean_a = a.iter().sum::<f64>() / 12.0;
    let mean_b = b.iter().sum::<f64>() / 12.0;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denominator = (var_a * var_b).sqrt();
    (denominator > f64::EPSILON).then(|| cov / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::chord;

    /// One octave of tones starting at `root`, loud in proportion to the
    /// profile weight of each scale degree
    fn profile_chord(root: u8, profile: &[f64; 12]) -> MonoAudio {
        let notes: Vec<(u8, f32)> = (0..12u8)
            .map(|degree| (root + degree, 0.06 * (profile[degree as usize] / 6.35) as f32))
            .collect();
        MonoAudio {
            samples: chord(22050, &notes, 6.0),
            sample_rate: 22050,
        }
    }

    #[test]
    fn test_major_profile_is_c_major() {
        // C5
        let audio = profile_chord(72, &MAJOR_PROFILE);
        assert_eq!(estimate_key(&audio).unwrap().as_deref(), Some("C Major"));
    }

    #[test]
    fn test_minor_profile_is_a_minor() {
        // A4
        let audio = profile_chord(69, &MINOR_PROFILE);
        assert_eq!(estimate_key(&audio).unwrap().as_deref(), Some("A Minor"));
    }

    #[test]
    fn test_transposed_profile() {
        // F#4
        let audio = profile_chord(66, &MAJOR_PROFILE);
        assert_eq!(estimate_key(&audio).unwrap().as_deref(), Some("F# Major"));
    }

    #[test]
    fn test_silence_has_no_key() {
        let audio = MonoAudio {
            samples: vec![0.0; 22050 * 2],
            sample_rate: 22050,
        };
        assert_eq!(estimate_key(&audio).unwrap(), None);
    }

    #[test]
    fn test_pitch_class() {
        assert_eq!(pitch_class(440.0), Some(9));
        assert_eq!(pitch_class(261.63), Some(0));
        assert_eq!(pitch_class(466.16), Some(10));
        assert_eq!(pitch_class(20.0), None);
        assert_eq!(pitch_class(5000.0), None);
    }

    #[test]
    fn test_key_names_normalize_to_themselves() {
        use crate::enrichment::domain::normalize_key;

        let mut chroma = [0.0; 12];
        chroma.copy_from_slice(&MINOR_PROFILE);
        let key = key_from_chroma(&chroma).unwrap();
        assert_eq!(key, "C Minor");
        assert_eq!(normalize_key(&key).as_deref(), Some("C Minor"));
    }
}
