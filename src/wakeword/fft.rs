//! Windowing and the real-valued STFT step of [`super::WakewordTrigger`]:
//! precomputed Hann window, `rustfft`'s real-to-complex forward plan,
//! multiply-then-`process`.

use crate::error::{PipelineError, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()
        })
        .collect()
}

/// Windowed real-to-complex FFT over a fixed-size sample window, producing
/// an interleaved layout: entry 0 is the DC real part, entry 1 is the
/// Nyquist real part, entries `2..window_size-1` are interleaved
/// real/imaginary pairs for bins `1..window_size/2`.
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    window_size: usize,
    scratch: Vec<Complex<f32>>,
}

impl Stft {
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 || window_size % 2 != 0 {
            return Err(PipelineError::config(format!(
                "fft-window-size must be even, got {window_size}"
            )));
        }
        let mut planner = FftPlanner::<f32>::new();
        Ok(Self {
            fft: planner.plan_fft_forward(window_size),
            window: hann_window(window_size),
            window_size,
            scratch: vec![Complex::new(0.0, 0.0); window_size],
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// `samples` and `output` must both have length `window_size`.
    pub fn transform(&mut self, samples: &[f32], output: &mut [f32]) {
        debug_assert_eq!(samples.len(), self.window_size);
        debug_assert_eq!(output.len(), self.window_size);

        for (i, &s) in samples.iter().enumerate() {
            self.scratch[i] = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        output[0] = self.scratch[0].re;
        output[1] = self.scratch[self.window_size / 2].re;
        for k in 1..self.window_size / 2 {
            output[2 * k] = self.scratch[k].re;
            output[2 * k + 1] = self.scratch[k].im;
        }
    }
}

/// Compute the magnitude spectrum fed to the mel filter model from an
/// [`Stft::transform`] output. `magnitudes` must have length
/// `window_size / 2 + 1`.
pub fn magnitudes(stft_output: &[f32], magnitudes: &mut [f32]) {
    let half = magnitudes.len() - 1;
    magnitudes[0] = stft_output[0];
    magnitudes[half] = stft_output[1];
    for k in 1..half {
        let re = stft_output[2 * k];
        let im = stft_output[2 * k + 1];
        magnitudes[k] = (re * re + im * im).sqrt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_odd_window_size() {
        assert!(Stft::new(161).is_err());
    }

    #[test]
    fn dc_only_signal_concentrates_energy_at_bin_zero() {
        let mut stft = Stft::new(8).unwrap();
        let samples = vec![1.0f32; 8];
        let mut output = vec![0.0f32; 8];
        stft.transform(&samples, &mut output);
        let mut mags = vec![0.0f32; 5];
        magnitudes(&output, &mut mags);
        assert!(mags[0] > mags[1]);
        assert!(mags[0] > mags[4]);
    }

    #[test]
    fn hann_window_is_zero_at_its_edges() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[7] - 0.0).abs() < 0.2); // last sample, not exactly zero for even N
    }
}
