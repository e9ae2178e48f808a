//! Fixed-rate interleaved sample buffer

use std::ops::Range;

use crate::error::{Error, Result};

/// Convert a time offset in seconds to the nearest frame index.
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    if secs <= 0.0 {
        return 0;
    }
    (secs * sample_rate as f64).round() as usize
}

/// Convert a frame count back to seconds.
pub fn frames_to_secs(frames: usize, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}

/// A sequence of interleaved `f32` samples with its sample rate and channel count.
///
/// Samples are owned privately; code outside the crate only ever reads them.
/// The assembler and post-processor mutate buffers they own through
/// crate-private accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Wrap interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::ConfigError("sample rate must be positive".to_string()));
        }
        if channels == 0 {
            return Err(Error::ConfigError("channel count must be positive".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Error::ConfigError(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Mono buffer from samples.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Silence lasting `frames` frames.
    pub fn silence_frames(frames: usize, sample_rate: u32, channels: u16) -> Result<Self> {
        let channels = channels.max(1);
        let len = frames.checked_mul(channels as usize).ok_or_else(|| {
            Error::ConfigError(format!("{} frames x{} overflows a buffer", frames, channels))
        })?;
        Ok(Self {
            samples: vec![0.0; len],
            sample_rate: sample_rate.max(1),
            channels,
        })
    }

    /// Buffer holding no frames.
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Silence lasting `secs` seconds, rounded to the nearest frame.
    pub fn silence(secs: f64, sample_rate: u32, channels: u16) -> Result<Self> {
        Self::silence_frames(secs_to_frames(secs, sample_rate), sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub(crate) fn replace_samples(&mut self, samples: Vec<f32>) {
        debug_assert_eq!(samples.len() % self.channels as usize, 0);
        self.samples = samples;
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        frames_to_secs(self.frames(), self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Interleaved samples covering the given frame range.
    pub fn frame_slice(&self, frames: Range<usize>) -> &[f32] {
        let ch = self.channels as usize;
        let end = frames.end.min(self.frames());
        let start = frames.start.min(end);
        &self.samples[start * ch..end * ch]
    }

    /// Whether every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }

    /// Peak absolute amplitude of one frame across its channels.
    pub(crate) fn frame_peak(&self, frame: usize) -> f32 {
        let ch = self.channels as usize;
        self.samples[frame * ch..(frame + 1) * ch]
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Keep only the first `frames` frames.
    pub fn truncated(&self, frames: usize) -> Self {
        Self {
            samples: self.frame_slice(0..frames).to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Split into one sample vector per channel.
    pub fn deinterleave(&self) -> Vec<Vec<f32>> {
        let ch = self.channels as usize;
        let mut planes = vec![Vec::with_capacity(self.frames()); ch];
        for frame in self.samples.chunks_exact(ch) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        planes
    }

    /// Build a buffer from per-channel planes of equal length.
    pub fn interleave(planes: &[Vec<f32>], sample_rate: u32) -> Result<Self> {
        let channels = planes.len();
        if channels == 0 {
            return Err(Error::ConfigError("no channels to interleave".to_string()));
        }
        let frames = planes[0].len();
        if planes.iter().any(|p| p.len() != frames) {
            return Err(Error::ConfigError(
                "channel planes differ in length".to_string(),
            ));
        }
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            samples.extend(planes.iter().map(|p| p[i]));
        }
        Self::new(samples, sample_rate, channels as u16)
    }

    /// Convert to `channels` channels: down-mix averages, up-mix duplicates.
    pub fn with_channels(&self, channels: u16) -> Self {
        let channels = channels.max(1);
        if channels == self.channels {
            return self.clone();
        }
        let src = self.channels as usize;
        let mut samples = Vec::with_capacity(self.frames() * channels as usize);
        for frame in self.samples.chunks_exact(src) {
            if channels == 1 {
                samples.push(frame.iter().sum::<f32>() / src as f32);
            } else if src == 1 {
                samples.extend(std::iter::repeat(frame[0]).take(channels as usize));
            } else {
                let mono = frame.iter().sum::<f32>() / src as f32;
                samples.extend(std::iter::repeat(mono).take(channels as usize));
            }
        }
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels,
        }
    }
}
