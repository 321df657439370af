//! Static tuner configuration.
//!
//! Every tunable constant of the pipeline lives here. A configuration is
//! loaded once at startup (optionally from TOML) and never changes while a
//! session runs.

use crate::error::ConfigError;
use crate::smoothing::SmoothingPolicy;
use crate::tuning::{self, TuningTarget};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuner configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Samples per analysed frame, a power of two (default: 2048)
    pub frame_size: usize,

    /// Frames with RMS below this are treated as silence (default: 0.01)
    /// Lower = more sensitive, but noise triggers more often
    pub rms_threshold: f32,

    /// Edge-trim amplitude used before autocorrelation (default: 0.2)
    pub trim_threshold: f32,

    /// Minimum ratio of the chosen correlation peak to the zero-lag
    /// energy for a period to be accepted (default: 0.3)
    pub min_clarity: f32,

    /// Lowest plausible fundamental in Hz, exclusive (default: 40.0)
    pub min_frequency: f32,

    /// Highest plausible fundamental in Hz, exclusive (default: 4000.0).
    /// Estimates stay accurate up to about 2 kHz; tones closer to this edge
    /// can read as a sub-harmonic.
    pub max_frequency: f32,

    /// Number of recent estimates averaged (default: 8)
    pub history_capacity: usize,

    /// How the history is averaged (default: plain mean)
    pub smoothing: SmoothingPolicy,

    /// Consecutive agreeing frames before the displayed state changes (default: 4)
    pub stable_frames: u32,

    /// |cents| at or below this is in tune (default: 5)
    pub tuned_cents: u32,

    /// |cents| below this (and above `tuned_cents`) is near (default: 15)
    pub near_cents: u32,

    /// Pipeline passes per second (default: 60)
    pub refresh_rate_hz: u32,

    /// Optional minimum in-band energy ratio for the spectral gate
    /// (default: disabled)
    pub spectral_gate: Option<f32>,

    /// Preset used when `targets` is absent (default: "standard")
    pub tuning: String,

    /// Explicit target table, overrides `tuning`
    pub targets: Option<Vec<TuningTarget>>,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            rms_threshold: 0.01,
            trim_threshold: 0.2,
            min_clarity: 0.3,
            min_frequency: 40.0,
            max_frequency: 4000.0,
            history_capacity: 8,
            smoothing: SmoothingPolicy::Mean,
            stable_frames: 4,
            tuned_cents: 5,
            near_cents: 15,
            refresh_rate_hz: 60,
            spectral_gate: None,
            tuning: "standard".to_string(),
            targets: None,
        }
    }
}

impl TunerConfig {
    /// Parses a TOML document. Missing keys take their default values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TunerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Checks every value against its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !self.frame_size.is_power_of_two() || !(256..=16384).contains(&self.frame_size) {
            return invalid(format!(
                "frame_size must be a power of two in 256..=16384, got {}",
                self.frame_size
            ));
        }
        if !(self.rms_threshold >= 0.0 && self.rms_threshold < 1.0) {
            return invalid(format!("rms_threshold must be in [0, 1), got {}", self.rms_threshold));
        }
        if !(self.trim_threshold > 0.0 && self.trim_threshold <= 1.0) {
            return invalid(format!("trim_threshold must be in (0, 1], got {}", self.trim_threshold));
        }
        if !(self.min_clarity >= 0.0 && self.min_clarity <= 1.0) {
            return invalid(format!("min_clarity must be in [0, 1], got {}", self.min_clarity));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency) {
            return invalid(format!(
                "frequency band must satisfy 0 < min < max, got {}..{}",
                self.min_frequency, self.max_frequency
            ));
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be at least 1".to_string());
        }
        if self.stable_frames == 0 {
            return invalid("stable_frames must be at least 1".to_string());
        }
        if self.tuned_cents >= self.near_cents {
            return invalid(format!(
                "tuned_cents ({}) must be below near_cents ({})",
                self.tuned_cents, self.near_cents
            ));
        }
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > 1000 {
            return invalid(format!(
                "refresh_rate_hz must be in 1..=1000, got {}",
                self.refresh_rate_hz
            ));
        }
        if let Some(ratio) = self.spectral_gate {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return invalid(format!("spectral_gate must be in (0, 1], got {ratio}"));
            }
        }
        Ok(())
    }

    /// Resolves the target table: the explicit list if given, otherwise the
    /// named preset.
    pub fn targets(&self) -> Result<Vec<TuningTarget>, ConfigError> {
        let targets = match &self.targets {
            Some(targets) => targets.clone(),
            None => tuning::preset(&self.tuning)
                .ok_or_else(|| ConfigError::UnknownTuning(self.tuning.clone()))?
                .to_vec(),
        };

        validate_targets(&targets)?;
        Ok(targets)
    }

    /// Time between two pipeline passes.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.refresh_rate_hz.max(1)))
    }
}

/// Checks that a target table is non-empty and every frequency is positive.
pub fn validate_targets(targets: &[TuningTarget]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::Invalid("target list is empty".to_string()));
    }
    if let Some(bad) = targets
        .iter()
        .find(|t| !(t.frequency.is_finite() && t.frequency > 0.0))
    {
        return Err(ConfigError::Invalid(format!(
            "target {} has non-positive frequency {}",
            bad.name, bad.frequency
        )));
    }
    Ok(())
}
