//! # Error Types
//!
//! Failures that leave the core, plus the reasons a single frame can be
//! rejected inside the pipeline. Only [`SessionError`] and [`ConfigError`]
//! ever reach a caller as `Err`; a [`Rejection`] collapses to "no pitch".

use thiserror::Error;

/// Problems loading or validating a [`crate::config::TunerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its permitted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The named tuning preset does not exist.
    #[error("unknown tuning preset: {0}")]
    UnknownTuning(String),
}

/// Reasons the audio capture collaborator could not be opened.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoInputDevice,

    #[error("no suitable f32 input format found")]
    UnsupportedFormat,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Failures reported by [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Capture could not be acquired at session start. Not retried.
    #[error("audio capture unavailable: {0}")]
    CaptureUnavailable(#[from] CaptureError),

    /// The target table is empty.
    #[error("no tuning targets configured")]
    NoTargets,

    /// The configuration or a target is out of range.
    #[error("invalid session setup: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Why a frame produced no pitch. These are normal conditions, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// RMS below the silence threshold.
    SignalTooWeak,
    /// Too little energy inside the instrument band (spectral gate).
    NotTonal,
    /// Autocorrelation found no usable peak.
    AmbiguousPeriod,
    /// The estimate fell outside the plausible frequency band.
    OutOfRange,
}
