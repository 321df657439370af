//! # Musical Tuning Module
//!
//! Target tables for the tuner and the arithmetic that relates a measured
//! frequency to them.
//!
//! ## Features
//! - Standard six-string guitar tuning plus a few alternate presets
//! - Scientific pitch name parsing in equal temperament (A4 = 440 Hz)
//! - Nearest-target matching with cent deviation
//! - Automatic or locked target selection

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single pitch the tuner can aim for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningTarget {
    /// Label shown to the player (e.g., "E2", "G3").
    pub name: String,
    /// Target frequency in Hz. Always positive.
    pub frequency: f32,
}

impl TuningTarget {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Standard guitar tuning, low string first.
pub static STANDARD_TUNING: Lazy<Vec<TuningTarget>> = Lazy::new(|| {
    [
        ("E2", 82.41),
        ("A2", 110.00),
        ("D3", 146.83),
        ("G3", 196.00),
        ("B3", 246.94),
        ("E4", 329.63),
    ]
    .into_iter()
    .map(|(name, frequency)| TuningTarget::new(name, frequency))
    .collect()
});

/// Named tuning presets. Everything except `standard` is derived from
/// equal temperament.
static PRESETS: Lazy<BTreeMap<&'static str, Vec<TuningTarget>>> = Lazy::new(|| {
    let from_names = |names: [&str; 6]| -> Vec<TuningTarget> {
        names
            .iter()
            .filter_map(|name| note_frequency(name).map(|f| TuningTarget::new(*name, f)))
            .collect()
    };

    let mut presets = BTreeMap::new();
    presets.insert("standard", STANDARD_TUNING.clone());
    presets.insert("drop-d", from_names(["D2", "A2", "D3", "G3", "B3", "E4"]));
    presets.insert(
        "half-step-down",
        from_names(["Eb2", "Ab2", "Db3", "Gb3", "Bb3", "Eb4"]),
    );
    presets.insert("open-g", from_names(["D2", "G2", "D3", "G3", "B3", "D4"]));
    presets
});

/// Looks up a tuning preset by name.
pub fn preset(name: &str) -> Option<&'static [TuningTarget]> {
    PRESETS.get(name).map(Vec::as_slice)
}

/// Names of all available presets, sorted.
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.keys().copied()
}

/// Converts a scientific pitch name like "A4", "C#3" or "Bb2" to its
/// equal-temperament frequency with A4 = 440 Hz.
///
/// Returns `None` if the name cannot be parsed.
pub fn note_frequency(name: &str) -> Option<f32> {
    let mut chars = name.chars();
    let semitone: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave_str.parse().ok()?;

    let midi = (octave + 1) * 12 + semitone + accidental;
    Some(440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0))
}

/// Calculates the deviation of `freq` from `target_freq` in cents.
///
/// - 100 cents = 1 semitone
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// Both frequencies must be positive and finite, otherwise `None`.
pub fn cents_between(freq: f32, target_freq: f32) -> Option<f32> {
    if !(freq.is_finite() && target_freq.is_finite()) || freq <= 0.0 || target_freq <= 0.0 {
        return None;
    }
    Some(1200.0 * (freq / target_freq).log2())
}

/// The outcome of comparing a frequency with a target table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMatch<'a> {
    /// Position of the target in the table.
    pub index: usize,
    pub target: &'a TuningTarget,
    /// Rounded deviation in cents (positive = sharp).
    pub deviation_cents: i32,
}

/// Finds the target closest to `freq` in Hz and the rounded deviation from it.
///
/// Ties go to the target listed first. Returns `None` for an empty table or
/// a non-positive frequency.
pub fn match_target(freq: f32, targets: &[TuningTarget]) -> Option<TargetMatch<'_>> {
    let mut best: Option<(usize, f32)> = None;
    for (i, target) in targets.iter().enumerate() {
        let diff = (target.frequency - freq).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((i, diff)),
        }
    }

    let (index, _) = best?;
    deviation_from(freq, targets, index)
}

/// Computes the deviation of `freq` from the target at `index`.
pub fn deviation_from(freq: f32, targets: &[TuningTarget], index: usize) -> Option<TargetMatch<'_>> {
    let target = targets.get(index)?;
    let cents = cents_between(freq, target.frequency)?;
    Some(TargetMatch {
        index,
        target,
        deviation_cents: cents.round() as i32,
    })
}

/// How the session picks the target a frequency is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelection {
    /// Compare against whichever target is nearest.
    #[default]
    Auto,
    /// Always compare against the target at this index.
    Locked(usize),
}

impl TargetSelection {
    /// Resolves the selection for one frequency.
    pub fn resolve(self, freq: f32, targets: &[TuningTarget]) -> Option<TargetMatch<'_>> {
        match self {
            TargetSelection::Auto => match_target(freq, targets),
            TargetSelection::Locked(index) => deviation_from(freq, targets, index),
        }
    }
}

/// Finds the index of a target by name, case-insensitively.
pub fn target_index(targets: &[TuningTarget], name: &str) -> Option<usize> {
    targets.iter().position(|t| t.name.eq_ignore_ascii_case(name))
}
