//! Post-processing of the assembled timeline
//!
//! Three optional passes run in a fixed order on the canvas, in place:
//! edge trimming, internal gap normalization, then artifact removal. None of
//! them changes the buffer length, and running the processor a second time
//! on its own output leaves it unchanged.

mod gaps;
mod regions;
mod trim;
mod unvoiced;

use serde::Serialize;
use tracing::debug;

use crate::audio::AudioBuffer;
use crate::config::PostProcessConfig;
use crate::span::Span;
use regions::{ms_to_frames, RegionDetector};

/// What the passes changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostProcessReport {
    /// Non-silent frames zeroed before the first voiced region
    pub lead_frames_trimmed: usize,
    /// Non-silent frames zeroed after the last voiced region
    pub tail_frames_trimmed: usize,
    pub gaps_adjusted: usize,
    pub artifacts_removed: usize,
}

impl PostProcessReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub struct PostProcessor {
    config: PostProcessConfig,
}

impl PostProcessor {
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Run the enabled passes over `buffer`; `spans` provide the expected gaps.
    pub fn process(&self, buffer: &mut AudioBuffer, spans: &[Span]) -> PostProcessReport {
        let mut report = PostProcessReport::default();
        if !self.config.any_enabled() || buffer.is_empty() {
            return report;
        }

        let sample_rate = buffer.sample_rate();
        let detector = RegionDetector::from_config(&self.config, sample_rate);
        let frames_before = buffer.frames();

        if self.config.trim_silence {
            let trimmed = trim::trim_edges(
                buffer,
                &detector,
                ms_to_frames(self.config.guard_ms, sample_rate),
            );
            report.lead_frames_trimmed = trimmed.lead_frames;
            report.tail_frames_trimmed = trimmed.tail_frames;
        }

        if self.config.fix_internal_silence {
            report.gaps_adjusted = gaps::fix_gaps(
                buffer,
                &detector,
                spans,
                ms_to_frames(self.config.gap_tolerance_ms, sample_rate),
            );
        }

        if self.config.remove_unvoiced {
            report.artifacts_removed = unvoiced::remove_artifacts(buffer, &detector);
        }

        debug_assert_eq!(buffer.frames(), frames_before);
        debug!("Post-processing: {:?}", report);
        report
    }
}
