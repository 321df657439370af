//! Frame gating ahead of pitch estimation.
//!
//! [`SilenceGate`] rejects frames that are too quiet to hold a note.
//! [`SpectralGate`] optionally rejects frames whose energy mostly lies
//! outside the instrument band (hum, hiss, clicks).

use crate::error::Rejection;
use crate::fft::SpectrumAnalyzer;
use crate::frame::Frame;

/// Root-mean-square level of a block of samples. Empty input is silent.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Energy gate over a whole frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceGate {
    threshold: f32,
}

impl SilenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Passes the frame unless its RMS is below the threshold.
    pub fn check(&self, frame: &Frame) -> Result<(), Rejection> {
        if rms(frame.samples()) < self.threshold {
            Err(Rejection::SignalTooWeak)
        } else {
            Ok(())
        }
    }
}

/// Rejects frames whose in-band energy ratio is below `min_ratio`.
#[derive(Debug, Clone)]
pub struct SpectralGate {
    analyzer: SpectrumAnalyzer,
    min_ratio: f32,
    low_hz: f32,
    high_hz: f32,
}

impl SpectralGate {
    pub fn new(frame_size: usize, min_ratio: f32, low_hz: f32, high_hz: f32) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(frame_size),
            min_ratio,
            low_hz,
            high_hz,
        }
    }

    pub fn check(&self, frame: &Frame) -> Result<(), Rejection> {
        let ratio = self.analyzer.band_energy_ratio(
            frame.samples(),
            frame.sample_rate(),
            self.low_hz,
            self.high_hz,
        );
        if ratio < self.min_ratio {
            Err(Rejection::NotTonal)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn rms_of_constant_and_empty() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn quiet_frames_are_rejected() {
        let gate = SilenceGate::new(0.01);
        let quiet = Frame::new(sine(110.0, 0.005, 44100, 2048), 44100);
        let loud = Frame::new(sine(110.0, 0.5, 44100, 2048), 44100);
        assert_eq!(gate.check(&quiet), Err(Rejection::SignalTooWeak));
        assert_eq!(gate.check(&loud), Ok(()));
        assert_eq!(gate.check(&Frame::new(vec![0.0; 2048], 44100)), Err(Rejection::SignalTooWeak));
    }

    #[test]
    fn out_of_band_tone_is_not_tonal() {
        let gate = SpectralGate::new(2048, 0.5, 40.0, 4000.0);
        let hiss = Frame::new(sine(9000.0, 0.5, 44100, 2048), 44100);
        let string = Frame::new(sine(196.0, 0.5, 44100, 2048), 44100);
        assert_eq!(gate.check(&hiss), Err(Rejection::NotTonal));
        assert_eq!(gate.check(&string), Ok(()));
    }
}
