//! # Tuning Session
//!
//! A [`Session`] binds a target table and a target selection to one live
//! capture source. It owns every piece of mutable pipeline state (history,
//! classifier, capture handle), so nothing about a running tuner lives in
//! globals.
//!
//! ## Lifecycle
//! - `start` opens capture; calling it while running does nothing
//! - `tick` runs one full pipeline pass on the latest frame
//! - `select_target` clears history and classifier synchronously
//! - `stop` halts ticking and releases capture; calling it again does nothing

use crate::classifier::{TuningClassifier, TuningState};
use crate::config::{self, TunerConfig};
use crate::error::{Rejection, SessionError};
use crate::frame::{CaptureProvider, Frame, FrameSource};
use crate::gate::{SilenceGate, SpectralGate};
use crate::pitch::PitchEstimator;
use crate::scheduler::StopHandle;
use crate::smoothing::HistorySmoother;
use crate::tuning::{TargetSelection, TuningTarget};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

/// What the presentation layer receives after each pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Smoothed frequency in Hz, present only when this frame had a pitch.
    pub frequency: Option<f32>,
    /// Unsmoothed estimate for this frame.
    pub raw_frequency: Option<f32>,
    pub target: Option<TuningTarget>,
    /// Rounded deviation from `target` in cents (positive = sharp).
    pub deviation_cents: Option<i32>,
    /// Displayed state after hysteresis.
    pub state: TuningState,
}

/// Gate, estimate, smooth, match, classify.
#[derive(Debug, Clone)]
struct Pipeline {
    silence: SilenceGate,
    spectral: Option<SpectralGate>,
    estimator: PitchEstimator,
    history: HistorySmoother,
    classifier: TuningClassifier,
    targets: Vec<TuningTarget>,
    selection: TargetSelection,
}

impl Pipeline {
    fn new(config: &TunerConfig, targets: Vec<TuningTarget>) -> Self {
        Self {
            silence: SilenceGate::new(config.rms_threshold),
            spectral: config.spectral_gate.map(|ratio| {
                SpectralGate::new(config.frame_size, ratio, config.min_frequency, config.max_frequency)
            }),
            estimator: PitchEstimator::from_config(config),
            history: HistorySmoother::new(config.history_capacity, config.smoothing),
            classifier: TuningClassifier::from_config(config),
            targets,
            selection: TargetSelection::Auto,
        }
    }

    fn detect(&self, frame: &Frame) -> Result<f32, Rejection> {
        self.silence.check(frame)?;
        if let Some(spectral) = &self.spectral {
            spectral.check(frame)?;
        }
        self.estimator.detect(frame.samples(), frame.sample_rate())
    }

    fn process(&mut self, frame: &Frame) -> PipelineReport {
        let raw = match self.detect(frame) {
            Ok(frequency) => Some(frequency),
            Err(rejection) => {
                trace!(?rejection, "frame rejected");
                None
            }
        };
        self.history.push(raw);
        let frequency = raw.and(self.history.current());
        self.report(raw, frequency)
    }

    /// A pass without any frame to look at.
    fn process_missing(&mut self) -> PipelineReport {
        self.report(None, None)
    }

    fn report(&mut self, raw: Option<f32>, frequency: Option<f32>) -> PipelineReport {
        let matched = frequency.and_then(|f| self.selection.resolve(f, &self.targets));
        let deviation_cents = matched.map(|m| m.deviation_cents);
        let target = matched.map(|m| m.target.clone());
        let state = self.classifier.observe(deviation_cents);

        PipelineReport {
            frequency,
            raw_frequency: raw,
            target,
            deviation_cents,
            state,
        }
    }

    fn reset(&mut self) {
        self.history.clear();
        self.classifier.reset();
    }
}

/// One tuning session. At most one should hold the capture device.
pub struct Session {
    config: TunerConfig,
    pipeline: Pipeline,
    source: Option<Box<dyn FrameSource>>,
    stop: StopHandle,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("running", &self.is_running())
            .field("selection", &self.pipeline.selection)
            .field("state", &self.pipeline.classifier.state())
            .finish()
    }
}

impl Session {
    /// Creates a stopped session. Fails on an empty target table, a
    /// non-positive target frequency, or a configuration that does not
    /// validate.
    pub fn new(config: &TunerConfig, targets: Vec<TuningTarget>) -> Result<Self, SessionError> {
        if targets.is_empty() {
            return Err(SessionError::NoTargets);
        }
        config.validate()?;
        config::validate_targets(&targets)?;
        let stop = StopHandle::new();
        stop.stop();
        Ok(Self {
            config: config.clone(),
            pipeline: Pipeline::new(config, targets),
            source: None,
            stop,
        })
    }

    /// Opens capture and begins a fresh session. A no-op when already running.
    ///
    /// On failure the session stays stopped and the cause is returned; there
    /// is no retry.
    pub fn start(&mut self, provider: &mut dyn CaptureProvider) -> Result<(), SessionError> {
        if self.is_running() {
            return Ok(());
        }
        // An external stop may have left a source behind.
        self.release();

        let source = provider.open(self.config.frame_size).map_err(|e| {
            warn!("Failed to open audio capture: {}", e);
            SessionError::CaptureUnavailable(e)
        })?;

        info!(
            "Tuning session started at {} Hz, frame size {}",
            source.sample_rate(),
            self.config.frame_size
        );
        self.pipeline.reset();
        self.source = Some(source);
        self.stop.rearm();
        Ok(())
    }

    /// Halts the session and releases capture. A no-op when already stopped.
    pub fn stop(&mut self) {
        self.stop.stop();
        self.release();
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            info!("Tuning session stopped, capture released");
        }
        self.pipeline.reset();
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some() && !self.stop.is_stopped()
    }

    /// Handle that stops this session from elsewhere. The session notices
    /// on its next tick and releases capture itself.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs one pipeline pass on the latest frame. `None` when stopped.
    pub fn tick(&mut self) -> Option<PipelineReport> {
        if self.stop.is_stopped() {
            if self.source.is_some() {
                self.release();
            }
            return None;
        }
        let frame = self.source.as_mut()?.latest_frame();
        Some(match frame {
            Some(frame) => self.pipeline.process(&frame),
            None => self.pipeline.process_missing(),
        })
    }

    /// Runs one pipeline pass on a given frame, independent of capture.
    pub fn process_frame(&mut self, frame: &Frame) -> PipelineReport {
        self.pipeline.process(frame)
    }

    /// Switches target selection, discarding history and resetting the
    /// classifier before any further pass. Returns `false` (and changes
    /// nothing) for an out-of-range index.
    pub fn select_target(&mut self, selection: TargetSelection) -> bool {
        if let TargetSelection::Locked(index) = selection {
            if index >= self.pipeline.targets.len() {
                warn!("Ignoring target index {} (only {} targets)", index, self.pipeline.targets.len());
                return false;
            }
        }
        self.pipeline.selection = selection;
        self.pipeline.reset();
        debug!(?selection, "target selection changed");
        true
    }

    pub fn selection(&self) -> TargetSelection {
        self.pipeline.selection
    }

    pub fn targets(&self) -> &[TuningTarget] {
        &self.pipeline.targets
    }

    pub fn state(&self) -> TuningState {
        self.pipeline.classifier.state()
    }

    /// Number of estimates currently held for smoothing.
    pub fn history_len(&self) -> usize {
        self.pipeline.history.len()
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }
}
