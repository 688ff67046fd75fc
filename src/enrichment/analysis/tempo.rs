//! Tempo estimation.
//!
//! Spectral flux gives an onset strength envelope; its autocorrelation peaks
//! at the beat period. A log-normal prior centred on 120 BPM picks between
//! the beat and its octaves, and a parabola through the peak refines the lag.

use super::decode::MonoAudio;
use super::spectrum::Stft;
use crate::enrichment::domain::ProviderError;

const FRAME_LEN: usize = 1024;
const HOP: usize = 256;

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;

/// Centre and width (in octaves) of the tempo prior
const PRIOR_BPM: f64 = 120.0;
const PRIOR_OCTAVES: f64 = 1.0;

/// Log compression applied to magnitudes before differencing
const COMPRESSION: f32 = 100.0;

/// Estimate the tempo, rounded to 0.1 BPM. `None` when nothing repeats.
pub fn estimate_bpm(audio: &MonoAudio) -> Result<Option<f64>, ProviderError> {
    let envelope = onset_envelope(audio)?;
    let frames_per_second = audio.sample_rate as f64 / HOP as f64;
    Ok(tempo_from_envelope(&envelope, frames_per_second))
}

/// Positive spectral flux per STFT frame.
fn onset_envelope(audio: &MonoAudio) -> Result<Vec<f32>, ProviderError> {
    let mut stft = Stft::new(FRAME_LEN, HOP);
    let mut previous: Vec<f32> = Vec::new();
    let mut envelope = Vec::new();

    stft.for_each_frame(&audio.samples, |magnitudes| {
        let mut flux = 0.0;
        if previous.len() == magnitudes.len() {
            for (prev, magnitude) in previous.iter_mut().zip(magnitudes) {
                let current = (COMPRESSION * magnitude).ln_1p();
                flux += (current - *prev).max(0.0);
                *prev = current;
            }
        } else {
            previous = magnitudes
                .iter()
                .map(|m| (COMPRESSION * m).ln_1p())
                .collect();
        }
        envelope.push(flux);
    })?;

    Ok(envelope)
}

fn tempo_from_envelope(envelope: &[f32], frames_per_second: f64) -> Option<f64> {
    let min_lag = (60.0 * frames_per_second / MAX_BPM).floor() as usize;
    let max_lag = (60.0 * frames_per_second / MIN_BPM).ceil() as usize;
    if min_lag < 2 || envelope.len() < 2 * (max_lag + 2) {
        return None;
    }

    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| v as f64 - mean).collect();

    // Indexed from min_lag - 1 so every scored lag has both neighbours
    let first = min_lag - 1;
    let autocorr: Vec<f64> = (first..=max_lag + 1)
        .map(|lag| {
            let sum: f64 = centered.iter().zip(&centered[lag..]).map(|(a, b)| a * b).sum();
            sum / (centered.len() - lag) as f64
        })
        .collect();

    let scores: Vec<f64> = (min_lag..=max_lag)
        .map(|lag| {
            let i = lag - first;
            let bpm = 60.0 * frames_per_second / lag as f64;
            (autocorr[i - 1] + autocorr[i] + autocorr[i + 1]) * prior(bpm)
        })
        .collect();

    let (best, &peak) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if peak.is_nan() || peak <= 0.0 {
        return None;
    }

    let mut offset = 0.0;
    if best > 0 && best + 1 < scores.len() {
        let (left, right) = (scores[best - 1], scores[best + 1]);
        let curvature = left - 2.0 * peak + right;
        if curvature < 0.0 {
            offset = (0.5 * (left - right) / curvature).clamp(-0.5, 0.5);
        }
    }

    let lag = (min_lag + best) as f64 + offset;
    let bpm = 60.0 * frames_per_second / lag;
    Some((bpm * 10.0).round() / 10.0)
}

fn prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}
