//! Voiced-region detection shared by all post-processing passes

use std::ops::Range;

use crate::audio::AudioBuffer;
use crate::config::PostProcessConfig;

pub(crate) fn ms_to_frames(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

/// Splits a buffer into voiced regions.
///
/// A frame is voiced when its peak amplitude reaches the threshold. Voiced
/// frames separated by fewer than `min_silence_frames` silent frames belong to
/// the same region.
#[derive(Debug, Clone)]
pub(crate) struct RegionDetector {
    threshold: f32,
    min_silence_frames: usize,
    max_artifact_frames: usize,
    artifact_rms: f32,
    ignore_artifacts: bool,
}

impl RegionDetector {
    pub fn from_config(config: &PostProcessConfig, sample_rate: u32) -> Self {
        Self {
            threshold: config.silence_threshold,
            min_silence_frames: ms_to_frames(config.min_silence_ms, sample_rate).max(1),
            max_artifact_frames: ms_to_frames(config.max_artifact_ms, sample_rate),
            artifact_rms: config.artifact_rms_threshold,
            ignore_artifacts: config.remove_unvoiced,
        }
    }

    /// Every voiced region, artifacts included.
    pub fn raw_regions(&self, buffer: &AudioBuffer) -> Vec<Range<usize>> {
        let mut regions = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for frame in 0..buffer.frames() {
            if buffer.frame_peak(frame) < self.threshold {
                continue;
            }
            current = match current {
                Some((start, last)) if frame - last - 1 < self.min_silence_frames => {
                    Some((start, frame))
                }
                Some((start, last)) => {
                    regions.push(start..last + 1);
                    Some((frame, frame))
                }
                None => Some((frame, frame)),
            };
        }
        if let Some((start, last)) = current {
            regions.push(start..last + 1);
        }
        regions
    }

    /// Short, quiet regions that are synthesis glitches rather than speech.
    pub fn is_artifact(&self, buffer: &AudioBuffer, region: &Range<usize>) -> bool {
        region.len() <= self.max_artifact_frames
            && rms(buffer.frame_slice(region.clone())) < self.artifact_rms
    }

    /// Regions treated as speech: all of them, or all but artifacts when
    /// artifact removal is enabled.
    pub fn speech_regions(&self, buffer: &AudioBuffer) -> Vec<Range<usize>> {
        let regions = self.raw_regions(buffer);
        if !self.ignore_artifacts {
            return regions;
        }
        regions
            .into_iter()
            .filter(|r| !self.is_artifact(buffer, r))
            .collect()
    }

    pub fn artifacts(&self, buffer: &AudioBuffer) -> Vec<Range<usize>> {
        self.raw_regions(buffer)
            .into_iter()
            .filter(|r| self.is_artifact(buffer, r))
            .collect()
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}
