//! Rolling history of recent pitch estimates.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How [`HistorySmoother::current`] combines the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingPolicy {
    /// Arithmetic mean of every entry.
    #[default]
    Mean,
    /// Entry `i` (oldest first, 0-indexed) weighs `1 + i / capacity`, so
    /// recent estimates pull harder.
    RecencyWeighted,
}

/// Fixed-capacity FIFO of valid frequency estimates.
///
/// Only real estimates are ever stored; a frame without pitch neither
/// pushes nor evicts.
#[derive(Debug, Clone)]
pub struct HistorySmoother {
    history: VecDeque<f32>,
    capacity: usize,
    policy: SmoothingPolicy,
}

impl HistorySmoother {
    pub fn new(capacity: usize, policy: SmoothingPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    /// Records an estimate, evicting the oldest one when full.
    /// `None` and non-positive values are ignored.
    pub fn push(&mut self, frequency: Option<f32>) {
        let Some(frequency) = frequency.filter(|f| f.is_finite() && *f > 0.0) else {
            return;
        };
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(frequency);
    }

    /// Smoothed frequency, or `None` while the history is empty.
    pub fn current(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        match self.policy {
            SmoothingPolicy::Mean => {
                Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
            }
            SmoothingPolicy::RecencyWeighted => {
                let n = self.capacity as f32;
                let (weighted, total) = self
                    .history
                    .iter()
                    .enumerate()
                    .fold((0.0, 0.0), |(sum, weights), (i, &f)| {
                        let w = 1.0 + i as f32 / n;
                        (sum + f * w, weights + w)
                    });
                Some(weighted / total)
            }
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
