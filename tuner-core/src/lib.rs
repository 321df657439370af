// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for audio capture, pitch detection,
//! target matching and the tuning-state decision. It is completely
//! headless and contains no presentation code.

pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fft;
pub mod frame;
pub mod gate;
pub mod pitch;
pub mod scheduler;
pub mod session;
pub mod smoothing;
pub mod tuning;

pub use classifier::{Direction, TuningState};
pub use config::TunerConfig;
pub use error::{CaptureError, ConfigError, Rejection, SessionError};
pub use frame::{CaptureProvider, Frame, FrameSource};
pub use session::{PipelineReport, Session};
pub use tuning::{TargetSelection, TuningTarget};
