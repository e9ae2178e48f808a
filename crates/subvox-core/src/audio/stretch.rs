//! Time-stretch capability used by the fit policy

use super::buffer::AudioBuffer;
use super::resample::resample_to_frames;
use crate::error::Result;

/// Scales a buffer to an exact length.
///
/// Implementations must return exactly `target_frames` frames at the input's
/// sample rate and channel count.
pub trait TimeStretch: Send + Sync {
    fn stretch(&self, buffer: &AudioBuffer, target_frames: usize) -> Result<AudioBuffer>;
}

/// Built-in stretcher: a sinc resample played back at the original rate.
///
/// This is a naive resample, so a compressed segment plays faster and higher
/// in pitch. The output length is exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleStretch;

impl TimeStretch for ResampleStretch {
    fn stretch(&self, buffer: &AudioBuffer, target_frames: usize) -> Result<AudioBuffer> {
        resample_to_frames(buffer, target_frames, buffer.sample_rate())
    }
}

/// Apply a playback-rate multiplier: `speed > 1.0` shortens the buffer.
pub fn apply_speed(
    stretcher: &dyn TimeStretch,
    buffer: &AudioBuffer,
    speed: f32,
) -> Result<AudioBuffer> {
    if (speed - 1.0).abs() < f32::EPSILON || buffer.is_empty() {
        return Ok(buffer.clone());
    }
    let target = (buffer.frames() as f64 / speed as f64).round() as usize;
    stretcher.stretch(buffer, target)
}
