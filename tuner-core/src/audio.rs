//! # Audio Capture Module
//!
//! Microphone capture through CPAL (Cross-Platform Audio Library).
//! The CPAL callback runs on the audio thread and only forwards mono sample
//! chunks over a bounded channel. The tuner thread drains that channel on
//! each tick and keeps a rolling window of the most recent samples, so it
//! always analyses the latest audio without ever blocking the callback.

use crate::error::CaptureError;
use crate::frame::{CaptureProvider, Frame, FrameSource};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use tracing::{debug, error, info};

/// Preferred capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Number of callback chunks that may queue up between two ticks before
/// new chunks are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// Opens the default input device.
#[derive(Debug, Clone)]
pub struct MicrophoneCapture {
    preferred_sample_rate: u32,
}

impl Default for MicrophoneCapture {
    fn default() -> Self {
        Self {
            preferred_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl MicrophoneCapture {
    pub fn with_sample_rate(preferred_sample_rate: u32) -> Self {
        Self { preferred_sample_rate }
    }
}

impl CaptureProvider for MicrophoneCapture {
    /// Starts audio capture from the default input device.
    ///
    /// - Format: 32-bit float
    /// - Channels: whatever the device offers, fewest first, downmixed to mono
    /// - Sample Rate: the supported rate closest to the preferred one
    fn open(&mut self, frame_size: usize) -> Result<Box<dyn FrameSource>, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoInputDevice)?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "<unnamed device>".to_string());
        info!("Using audio input device: {}", device_name);

        let configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Device(e.to_string()))?
            .collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, self.preferred_sample_rate)
            .ok_or(CaptureError::UnsupportedFormat)?;

        let rate = self.preferred_sample_rate.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels().max(1));
        let config: cpal::StreamConfig = config.into();

        info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

        let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    forward_mono(data, channels, &sender);
                },
                |err| error!("An error occurred on the audio stream: {}", err),
                None,
            )
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(Box::new(MicrophoneSource {
            _stream: stream,
            receiver,
            window: VecDeque::with_capacity(frame_size * 2),
            frame_size,
            sample_rate,
        }))
    }
}

/// Downmixes an interleaved callback buffer and sends it on, dropping the
/// chunk if the tuner has fallen behind.
fn forward_mono(data: &[f32], channels: usize, sender: &Sender<Vec<f32>>) {
    let chunk = if channels == 1 {
        data.to_vec()
    } else {
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    let _ = sender.try_send(chunk);
}

/// A running microphone stream. Dropping it stops capture.
pub struct MicrophoneSource {
    _stream: cpal::Stream,
    receiver: Receiver<Vec<f32>>,
    window: VecDeque<f32>,
    frame_size: usize,
    sample_rate: u32,
}

impl FrameSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        fill_window(&mut self.window, &self.receiver, self.frame_size);
        if self.window.len() < self.frame_size {
            return None;
        }
        let samples: Vec<f32> = self.window.iter().copied().collect();
        Some(Frame::new(samples, self.sample_rate))
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        debug!("Microphone stream released");
    }
}

/// Drains every pending chunk into `window`, keeping only the newest
/// `frame_size` samples.
fn fill_window(window: &mut VecDeque<f32>, receiver: &Receiver<Vec<f32>>, frame_size: usize) {
    while let Ok(chunk) = receiver.try_recv() {
        window.extend(chunk);
    }
    let excess = window.len().saturating_sub(frame_size);
    window.drain(..excess);
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Among those, fewer channels win, then
/// the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let in_range =
                c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let rate_diff = if in_range { 0 } else { min_diff.min(max_diff) };
            (c.channels(), rate_diff)
        })
}
