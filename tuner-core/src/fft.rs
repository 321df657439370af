//! # Fast Fourier Transform (FFT) Module
//!
//! Frequency-domain view of a frame, used by the optional spectral gate and
//! available to presentation layers that want to draw a spectrum.
//!
//! ## Features
//! - Forward FFT using RustFFT, planned once per frame size
//! - Hann windowing for reduced spectral leakage
//! - DC offset removal
//! - In-band energy ratio

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Centres a frame on zero and tapers it with a Hann window, in place.
///
/// Microphone bias would otherwise land in bin 0 and count as out-of-band
/// energy for the spectral gate.
fn condition_frame(frame: &mut [f32]) {
    if frame.is_empty() {
        return;
    }
    let mean = frame.iter().sum::<f32>() / frame.len() as f32;
    let span = frame.len().saturating_sub(1).max(1) as f32;
    for (i, sample) in frame.iter_mut().enumerate() {
        let phase = std::f32::consts::TAU * i as f32 / span;
        *sample = (*sample - mean) * 0.5 * (1.0 - phase.cos());
    }
}

/// A forward FFT planned for one frame size.
#[derive(Clone)]
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer").field("size", &self.size).finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Performs a forward FFT on a signal and returns the complex spectrum.
    ///
    /// The signal is DC-corrected and Hann-windowed first. Signals shorter
    /// than the planned size are zero-padded, longer ones truncated.
    pub fn spectrum(&self, signal: &[f32]) -> Vec<Complex<f32>> {
        let mut frame = signal[..signal.len().min(self.size)].to_vec();
        condition_frame(&mut frame);
        frame.resize(self.size, 0.0);

        let mut buffer: Vec<Complex<f32>> = frame
            .into_iter()
            .map(|sample| Complex { re: sample, im: 0.0 })
            .collect();

        self.fft.process(&mut buffer);
        buffer
    }

    /// Magnitudes of the bins from DC up to (excluding) Nyquist.
    pub fn magnitude_spectrum(&self, signal: &[f32]) -> Vec<f32> {
        self.spectrum(signal)
            .iter()
            .take(self.size / 2)
            .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
            .collect()
    }

    /// Fraction of spectral energy (squared magnitude) that lies inside
    /// `[low_hz, high_hz]`. Returns 0 for a frame with no energy.
    pub fn band_energy_ratio(&self, signal: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32) -> f32 {
        let bin_hz = sample_rate as f32 / self.size as f32;
        let mut total = 0.0;
        let mut in_band = 0.0;
        for (bin, c) in self.spectrum(signal).iter().take(self.size / 2).enumerate() {
            let energy = c.norm_sqr();
            total += energy;
            let freq = bin as f32 * bin_hz;
            if freq >= low_hz && freq <= high_hz {
                in_band += energy;
            }
        }
        if total > 0.0 { in_band / total } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn peak_bin_matches_tone() {
        let analyzer = SpectrumAnalyzer::new(1024);
        let mags = analyzer.magnitude_spectrum(&sine(1000.0, 8000, 1024));
        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz at 8000/1024 Hz per bin is bin 128.
        assert_eq!(peak, 128);
        assert_eq!(mags.len(), 512);
    }

    #[test]
    fn tone_energy_is_in_band() {
        let analyzer = SpectrumAnalyzer::new(2048);
        let signal = sine(220.0, 44100, 2048);
        assert!(analyzer.band_energy_ratio(&signal, 44100, 40.0, 4000.0) > 0.95);
        assert!(analyzer.band_energy_ratio(&signal, 44100, 5000.0, 20000.0) < 0.05);
    }

    #[test]
    fn conditioned_frame_is_centred_and_tapered() {
        let mut frame = vec![1.5, 0.5, 1.5, 0.5, 1.5];
        condition_frame(&mut frame);
        // Mean 1.1, Hann weights 0, 0.5, 1, 0.5, 0.
        let expected = [0.0, -0.3, 0.4, -0.3, 0.0];
        for (got, want) in frame.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{frame:?}");
        }

        let mut empty: Vec<f32> = vec![];
        condition_frame(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn dc_only_has_no_energy() {
        let analyzer = SpectrumAnalyzer::new(256);
        assert_eq!(analyzer.band_energy_ratio(&[0.5; 256], 8000, 40.0, 4000.0), 0.0);
    }
}
