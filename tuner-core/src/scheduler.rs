//! Display-rate scheduling for the tuner loop.
//!
//! [`FrameClock`] runs one pipeline pass per period on the calling thread.
//! The loop checks its [`StopHandle`] before every pass and before every
//! reschedule, so raising the flag (from any thread) takes effect without
//! waiting for another pass.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared stop flag. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn rearm(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Repeating task with a fixed period and a stop flag.
#[derive(Debug, Clone)]
pub struct FrameClock {
    period: Duration,
    stop: StopHandle,
}

impl FrameClock {
    pub fn new(period: Duration, stop: StopHandle) -> Self {
        Self { period, stop }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Calls `pass` once per period until the flag is raised or `pass`
    /// breaks. Returns the number of passes run.
    pub fn run<F>(&self, mut pass: F) -> u64
    where
        F: FnMut() -> ControlFlow<()>,
    {
        let mut passes = 0;
        while !self.stop.is_stopped() {
            let started = Instant::now();
            passes += 1;
            if pass().is_break() {
                break;
            }
            if self.stop.is_stopped() {
                break;
            }
            if let Some(remaining) = self.period.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_flag_prevents_any_pass() {
        let stop = StopHandle::new();
        stop.stop();
        let clock = FrameClock::new(Duration::from_millis(1), stop);
        assert_eq!(clock.run(|| ControlFlow::Continue(())), 0);
    }

    #[test]
    fn stop_inside_pass_halts_before_reschedule() {
        let clock = FrameClock::new(Duration::from_millis(1), StopHandle::new());
        let handle = clock.stop_handle();
        let mut calls = 0;
        let passes = clock.run(|| {
            calls += 1;
            if calls == 3 {
                handle.stop();
            }
            ControlFlow::Continue(())
        });
        assert_eq!(passes, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn break_ends_loop() {
        let clock = FrameClock::new(Duration::ZERO, StopHandle::new());
        let mut calls = 0;
        let passes = clock.run(|| {
            calls += 1;
            if calls == 5 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(passes, 5);
        assert!(!clock.stop_handle().is_stopped());
    }

    #[test]
    fn stop_from_another_thread() {
        let clock = FrameClock::new(Duration::from_millis(2), StopHandle::new());
        let handle = clock.stop_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            handle.stop();
        });
        let passes = clock.run(|| ControlFlow::Continue(()));
        stopper.join().unwrap();
        assert!(passes >= 1);
        assert!(clock.stop_handle().is_stopped());
    }
}
