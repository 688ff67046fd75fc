//! Short-time Fourier transform shared by the tempo and key estimators.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::enrichment::domain::ProviderError;

/// Hann-windowed STFT over fixed-size frames.
pub struct Stft {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    hop: usize,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl Stft {
    pub fn new(frame_len: usize, hop: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_len);

        // Hann window for reduced spectral leakage
        let window: Vec<f32> = (0..frame_len)
            .map(|i| {
                let x = std::f32::consts::PI * 2.0 * i as f32 / (frame_len - 1) as f32;
                0.5 * (1.0 - x.cos())
            })
            .collect();

        Self {
            input: fft.make_input_vec(),
            output: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            magnitudes: vec![0.0; frame_len / 2 + 1],
            fft,
            window,
            hop: hop.max(1),
        }
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_hz(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.window.len() as f32
    }

    /// Number of frequency bins per frame.
    pub fn bins(&self) -> usize {
        self.magnitudes.len()
    }

    /// Call `f` with the magnitude spectrum of every complete frame.
    pub fn for_each_frame<F>(&mut self, samples: &[f32], mut f: F) -> Result<(), ProviderError>
    where
        F: FnMut(&[f32]),
    {
        let frame_len = self.window.len();
        if samples.len() < frame_len {
            return Ok(());
        }

        for start in (0..=samples.len() - frame_len).step_by(self.hop) {
            let frame = &samples[start..start + frame_len];
            for ((dst, sample), w) in self.input.iter_mut().zip(frame).zip(&self.window) {
                *dst = sample * w;
            }

            self.fft
                .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
                .map_err(|e| ProviderError::Analysis(e.to_string()))?;

            for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.output) {
                *magnitude = bin.norm();
            }
            f(&self.magnitudes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let sample_rate = 8000;
        let mut stft = Stft::new(1024, 512);
        let bin_hz = stft.bin_hz(sample_rate);
        // Exactly on bin 64
        let freq = 64.0 * bin_hz;
        let samples: Vec<f32> = (0..4096)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();

        let mut frames = 0;
        stft.for_each_frame(&samples, |magnitudes| {
            frames += 1;
            let peak = magnitudes
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(bin, _)| bin);
            assert_eq!(peak, Some(64));
        })
        .unwrap();

        // (4096 - 1024) / 512 + 1
        assert_eq!(frames, 7);
        assert_eq!(stft.bins(), 513);
    }

    #[test]
    fn test_short_input_has_no_frames() {
        let mut stft = Stft::new(1024, 256);
        let mut frames = 0;
        stft.for_each_frame(&[0.0; 1000], |_| frames += 1).unwrap();
        assert_eq!(frames, 0);
    }
}
