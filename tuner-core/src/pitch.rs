//! # Pitch Detection Module
//!
//! Fundamental-frequency estimation by time-domain autocorrelation.
//!
//! ## Steps
//! 1. Trim near-silent padding from both ends of the frame
//! 2. Unnormalized autocorrelation over every lag of the trimmed frame
//! 3. Skip the initial decreasing run (the zero-lag lobe)
//! 4. Take the largest remaining correlation as the period; ties go to the
//!    smallest lag
//! 5. Parabolic interpolation for sub-sample accuracy
//! 6. Reject periods whose frequency falls outside the instrument band
//!
//! A period is only accepted when its correlation is at least
//! `min_clarity` times the zero-lag energy. Octave errors (locking onto a
//! multiple of the true period) are not corrected.
//!
//! Accuracy holds across the fretboard (up to about 2 kHz). Near the top of
//! the default band a period is only a few samples long, and an integer lag
//! spanning several periods can out-correlate the rounded single period, so
//! a 3 kHz tone may read as 1 kHz.

use crate::config::TunerConfig;
use crate::error::Rejection;

/// Autocorrelation pitch estimator. Holds only constants, so one instance
/// can serve any number of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimator {
    trim_threshold: f32,
    min_clarity: f32,
    min_frequency: f32,
    max_frequency: f32,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::from_config(&TunerConfig::default())
    }
}

impl PitchEstimator {
    pub fn from_config(config: &TunerConfig) -> Self {
        Self {
            trim_threshold: config.trim_threshold,
            min_clarity: config.min_clarity,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
        }
    }

    /// Estimates the fundamental frequency of `signal` in Hz.
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected frequency in Hz
    /// * `None` - No usable period, or the period is out of range
    pub fn estimate(&self, signal: &[f32], sample_rate: u32) -> Option<f32> {
        self.detect(signal, sample_rate).ok()
    }

    /// Like [`estimate`](Self::estimate) but says why a frame was rejected.
    pub fn detect(&self, signal: &[f32], sample_rate: u32) -> Result<f32, Rejection> {
        let buf = trim_edges(signal, self.trim_threshold);
        if buf.len() < 3 {
            return Err(Rejection::AmbiguousPeriod);
        }

        let corr = autocorrelation(buf);
        let start = end_of_initial_descent(&corr).ok_or(Rejection::AmbiguousPeriod)?;
        let lag = peak_lag(&corr, start).ok_or(Rejection::AmbiguousPeriod)?;

        // corr[0] is the frame energy and bounds every other lag.
        if corr[lag] < self.min_clarity * corr[0] {
            return Err(Rejection::AmbiguousPeriod);
        }

        let period = lag as f32 + parabolic_offset(&corr, lag);
        if period <= 0.0 {
            return Err(Rejection::AmbiguousPeriod);
        }

        let frequency = sample_rate as f32 / period;
        if frequency.is_finite() && frequency > self.min_frequency && frequency < self.max_frequency {
            Ok(frequency)
        } else {
            Err(Rejection::OutOfRange)
        }
    }
}

/// Returns the part of `signal` between the first sample below `threshold`
/// in the leading half and the last such sample in the trailing half.
fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let size = signal.len();
    let half = size / 2;

    let start = (0..half)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(size.saturating_sub(1));

    if start < end { &signal[start..end] } else { &[] }
}

/// `c[lag] = sum(buf[j] * buf[j + lag])` for every lag in the buffer.
fn autocorrelation(buf: &[f32]) -> Vec<f32> {
    let size = buf.len();
    (0..size)
        .map(|lag| {
            buf[..size - lag]
                .iter()
                .zip(&buf[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// First lag where the correlation stops falling, or `None` if it falls all
/// the way to the end.
fn end_of_initial_descent(corr: &[f32]) -> Option<usize> {
    let mut lag = 0;
    while lag + 1 < corr.len() && corr[lag] > corr[lag + 1] {
        lag += 1;
    }
    if lag + 1 < corr.len() { Some(lag) } else { None }
}

/// Lag of the largest positive correlation at or after `start`.
/// On equal values the first (smallest) lag wins.
fn peak_lag(corr: &[f32], start: usize) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (lag, &value) in corr.iter().enumerate().skip(start) {
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((lag, value)),
        }
    }
    match best {
        Some((lag, value)) if lag > 0 && value > 0.0 => Some(lag),
        _ => None,
    }
}

/// Sub-sample offset of the true peak around `lag`, in [-0.5, 0.5].
/// Zero when a neighbour is missing or the three points are collinear.
fn parabolic_offset(corr: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag + 1 >= corr.len() {
        return 0.0;
    }
    let s0 = corr[lag - 1];
    let s1 = corr[lag];
    let s2 = corr[lag + 1];

    let denominator = s0 - 2.0 * s1 + s2;
    if denominator.abs() <= f32::EPSILON * s1.abs() {
        return 0.0;
    }
    (0.5 * (s0 - s2) / denominator).clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn noise(len: usize) -> Vec<f32> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                0.5 * ((state as f32 / u32::MAX as f32) * 2.0 - 1.0)
            })
            .collect()
    }

    #[test]
    fn pure_tones_within_one_percent() {
        let estimator = PitchEstimator::default();
        for &freq in &[82.41, 110.0, 146.83, 196.0, 246.94, 329.63, 440.0] {
            let detected = estimator.estimate(&sine(freq, 0.5, 2048), SAMPLE_RATE).unwrap();
            let error = (detected - freq).abs() / freq;
            assert!(error < 0.01, "{freq} Hz detected as {detected} Hz");
        }
    }

    #[test]
    fn fretboard_range_within_one_percent() {
        let estimator = PitchEstimator::default();
        // High E string, 12th and 24th fret, and 2 kHz.
        for &freq in &[659.26, 1000.0, 1318.51, 2000.0] {
            let detected = estimator.estimate(&sine(freq, 0.5, 2048), SAMPLE_RATE).unwrap();
            let error = (detected - freq).abs() / freq;
            assert!(error < 0.01, "{freq} Hz detected as {detected} Hz");
        }
    }

    #[test]
    fn second_harmonic_does_not_hide_fundamental() {
        let signal: Vec<f32> = sine(110.0, 0.3, 2048)
            .iter()
            .zip(sine(220.0, 0.3, 2048))
            .map(|(a, b)| a + b)
            .collect();
        let detected = PitchEstimator::default().estimate(&signal, SAMPLE_RATE).unwrap();
        assert!((detected - 110.0).abs() < 1.1, "detected {detected}");
    }

    #[test]
    fn pulse_train_locks_to_shortest_period() {
        // Every multiple of the period correlates, the first one most strongly.
        let signal: Vec<f32> = (0..2048).map(|i| if i % 100 == 0 { 1.0 } else { 0.0 }).collect();
        let detected = PitchEstimator::default().estimate(&signal, SAMPLE_RATE).unwrap();
        assert_eq!(detected, 441.0);
    }

    #[test]
    fn equal_peaks_resolve_to_smallest_lag() {
        let corr = [10.0, 4.0, 1.0, 6.0, 2.0, 6.0, 1.0];
        let start = end_of_initial_descent(&corr).unwrap();
        assert_eq!(start, 2);
        assert_eq!(peak_lag(&corr, start), Some(3));
    }

    #[test]
    fn noise_has_no_pitch() {
        assert_eq!(
            PitchEstimator::default().detect(&noise(2048), SAMPLE_RATE),
            Err(Rejection::AmbiguousPeriod)
        );
    }

    #[test]
    fn constant_signal_is_ambiguous() {
        assert_eq!(
            PitchEstimator::default().detect(&[0.5; 2048], SAMPLE_RATE),
            Err(Rejection::AmbiguousPeriod)
        );
        assert_eq!(
            PitchEstimator::default().detect(&[], SAMPLE_RATE),
            Err(Rejection::AmbiguousPeriod)
        );
    }

    #[test]
    fn out_of_band_is_rejected() {
        let config = TunerConfig {
            max_frequency: 300.0,
            ..Default::default()
        };
        let estimator = PitchEstimator::from_config(&config);
        assert_eq!(
            estimator.detect(&sine(440.0, 0.5, 2048), SAMPLE_RATE),
            Err(Rejection::OutOfRange)
        );
    }

    #[test]
    fn trim_drops_loud_edges() {
        let signal = [0.9, 0.1, 0.5, 0.5, 0.05, 0.9];
        assert_eq!(trim_edges(&signal, 0.2), &[0.1_f32, 0.5, 0.5][..]);
    }

    #[test]
    fn flat_top_skips_refinement() {
        assert_eq!(parabolic_offset(&[3.0, 3.0, 3.0], 1), 0.0);
        assert_eq!(parabolic_offset(&[1.0, 3.0], 1), 0.0);
        let offset = parabolic_offset(&[2.0, 3.0, 1.0], 1);
        assert!(offset < 0.0 && offset > -0.5);
    }
}
