//! Tuning state with hysteresis.
//!
//! Each pipeline pass yields a candidate state from the current deviation.
//! The displayed state only follows once the same candidate has been seen
//! for `stable_frames` consecutive passes.

use crate::config::TunerConfig;
use serde::Serialize;

/// Which way the string is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Too high, loosen the string.
    Sharp,
    /// Too low, tighten the string.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "direction", rename_all = "snake_case")]
pub enum TuningState {
    /// No valid signal.
    #[default]
    Idle,
    Tuned,
    Near(Direction),
    Far(Direction),
}

/// Stateless mapping from a deviation to a [`TuningState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// |cents| <= this is tuned.
    pub tuned_cents: u32,
    /// |cents| < this (and above `tuned_cents`) is near, otherwise far.
    pub near_cents: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            tuned_cents: 5,
            near_cents: 15,
        }
    }
}

impl Thresholds {
    pub fn classify(&self, deviation_cents: Option<i32>) -> TuningState {
        let Some(cents) = deviation_cents else {
            return TuningState::Idle;
        };
        let magnitude = cents.unsigned_abs();
        let direction = if cents > 0 { Direction::Sharp } else { Direction::Flat };

        if magnitude <= self.tuned_cents {
            TuningState::Tuned
        } else if magnitude < self.near_cents {
            TuningState::Near(direction)
        } else {
            TuningState::Far(direction)
        }
    }
}

/// Hysteresis over [`Thresholds::classify`].
#[derive(Debug, Clone)]
pub struct TuningClassifier {
    thresholds: Thresholds,
    stable_frames: u32,
    displayed: TuningState,
    pending: Option<(TuningState, u32)>,
}

impl TuningClassifier {
    pub fn new(thresholds: Thresholds, stable_frames: u32) -> Self {
        Self {
            thresholds,
            stable_frames: stable_frames.max(1),
            displayed: TuningState::Idle,
            pending: None,
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(
            Thresholds {
                tuned_cents: config.tuned_cents,
                near_cents: config.near_cents,
            },
            config.stable_frames,
        )
    }

    /// Feeds one pass's deviation (`None` when there was no pitch) and
    /// returns the displayed state.
    pub fn observe(&mut self, deviation_cents: Option<i32>) -> TuningState {
        let candidate = self.thresholds.classify(deviation_cents);

        if candidate == self.displayed {
            self.pending = None;
            return self.displayed;
        }

        let count = match self.pending {
            Some((pending, count)) if pending == candidate => count + 1,
            _ => 1,
        };

        if count >= self.stable_frames {
            tracing::debug!(from = ?self.displayed, to = ?candidate, "tuning state changed");
            self.displayed = candidate;
            self.pending = None;
        } else {
            self.pending = Some((candidate, count));
        }
        self.displayed
    }

    pub fn state(&self) -> TuningState {
        self.displayed
    }

    /// Consecutive observations of the pending candidate so far.
    pub fn pending_count(&self) -> u32 {
        self.pending.map_or(0, |(_, count)| count)
    }

    /// Back to `Idle` with nothing pending.
    pub fn reset(&mut self) {
        self.displayed = TuningState::Idle;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled_at_tuned() -> TuningClassifier {
        let mut classifier = TuningClassifier::new(Thresholds::default(), 4);
        for _ in 0..4 {
            classifier.observe(Some(0));
        }
        assert_eq!(classifier.state(), TuningState::Tuned);
        classifier
    }

    #[test]
    fn thresholds_partition_cents() {
        let t = Thresholds::default();
        assert_eq!(t.classify(None), TuningState::Idle);
        assert_eq!(t.classify(Some(0)), TuningState::Tuned);
        assert_eq!(t.classify(Some(-5)), TuningState::Tuned);
        assert_eq!(t.classify(Some(6)), TuningState::Near(Direction::Sharp));
        assert_eq!(t.classify(Some(-14)), TuningState::Near(Direction::Flat));
        assert_eq!(t.classify(Some(15)), TuningState::Far(Direction::Sharp));
        assert_eq!(t.classify(Some(-200)), TuningState::Far(Direction::Flat));
    }

    #[test]
    fn fourth_near_frame_switches() {
        let mut classifier = settled_at_tuned();
        for _ in 0..3 {
            assert_eq!(classifier.observe(Some(10)), TuningState::Tuned);
        }
        assert_eq!(classifier.observe(Some(10)), TuningState::Near(Direction::Sharp));
    }

    #[test]
    fn agreeing_frame_clears_pending_change() {
        let mut classifier = settled_at_tuned();
        classifier.observe(Some(10));
        classifier.observe(Some(10));
        assert_eq!(classifier.pending_count(), 2);
        classifier.observe(Some(1));
        assert_eq!(classifier.pending_count(), 0);
        for _ in 0..3 {
            assert_eq!(classifier.observe(Some(10)), TuningState::Tuned);
        }
    }

    #[test]
    fn direction_change_restarts_count() {
        let mut classifier = settled_at_tuned();
        classifier.observe(Some(10));
        classifier.observe(Some(10));
        classifier.observe(Some(-10));
        assert_eq!(classifier.pending_count(), 1);
        assert_eq!(classifier.state(), TuningState::Tuned);
    }

    #[test]
    fn dropouts_decay_to_idle() {
        let mut classifier = settled_at_tuned();
        classifier.observe(None);
        assert_eq!(classifier.state(), TuningState::Tuned);
        for _ in 0..3 {
            classifier.observe(None);
        }
        assert_eq!(classifier.state(), TuningState::Idle);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut classifier = settled_at_tuned();
        classifier.observe(Some(30));
        classifier.reset();
        assert_eq!(classifier.state(), TuningState::Idle);
        assert_eq!(classifier.pending_count(), 0);
    }

    #[test]
    fn single_frame_stability_follows_immediately() {
        let mut classifier = TuningClassifier::new(Thresholds::default(), 1);
        assert_eq!(classifier.observe(Some(-40)), TuningState::Far(Direction::Flat));
    }
}
