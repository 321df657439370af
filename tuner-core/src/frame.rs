//! # Frames and Frame Sources
//!
//! The contract between the core and whatever captures audio. A source hands
//! out the most recent block of samples each time it is asked; it does not
//! promise that consecutive frames are disjoint or contiguous.

use crate::error::CaptureError;

/// One block of mono time-domain samples in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Box<[f32]>,
    sample_rate: u32,
}

impl Frame {
    pub fn new(samples: impl Into<Box<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Supplies the latest captured frame on demand.
pub trait FrameSource {
    /// Sample rate of every frame this source produces, in Hz.
    fn sample_rate(&self) -> u32;

    /// The most recent `frame_size` samples, or `None` until enough audio
    /// has been captured.
    fn latest_frame(&mut self) -> Option<Frame>;
}

/// Opens a capture device. Dropping the returned source releases it.
pub trait CaptureProvider {
    fn open(&mut self, frame_size: usize) -> Result<Box<dyn FrameSource>, CaptureError>;
}
