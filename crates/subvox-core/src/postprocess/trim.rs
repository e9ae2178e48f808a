//! Leading and trailing silence trimming
//!
//! Trimming keeps the buffer length: everything outside the speech extent
//! plus a guard band becomes digital silence.

use std::ops::Range;

use super::regions::RegionDetector;
use crate::audio::AudioBuffer;

/// Frames zeroed at each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TrimResult {
    pub lead_frames: usize,
    pub tail_frames: usize,
}

pub(crate) fn trim_edges(
    buffer: &mut AudioBuffer,
    detector: &RegionDetector,
    guard_frames: usize,
) -> TrimResult {
    let total = buffer.frames();
    let speech = detector.speech_regions(buffer);

    let (Some(first), Some(last)) = (speech.first(), speech.last()) else {
        let lead_frames = zero_frames(buffer, 0..total);
        return TrimResult {
            lead_frames,
            tail_frames: 0,
        };
    };

    let raw = detector.raw_regions(buffer);

    // Never cut through a region: a boundary landing inside one moves to its edge
    let mut lead_end = first.start.saturating_sub(guard_frames);
    if let Some(r) = raw.iter().find(|r| r.start < lead_end && r.end > lead_end) {
        lead_end = r.end;
    }
    let mut tail_start = (last.end + guard_frames).min(total);
    if let Some(r) = raw.iter().find(|r| r.start < tail_start && r.end > tail_start) {
        tail_start = r.start;
    }

    TrimResult {
        lead_frames: zero_frames(buffer, 0..lead_end),
        tail_frames: zero_frames(buffer, tail_start..total),
    }
}

/// Zero a frame range, returning how many frames held non-zero samples.
fn zero_frames(buffer: &mut AudioBuffer, frames: Range<usize>) -> usize {
    let ch = buffer.channels() as usize;
    let samples = buffer.samples_mut();
    let region = &mut samples[frames.start * ch..frames.end * ch];
    let touched = region
        .chunks_exact(ch)
        .filter(|frame| frame.iter().any(|s| *s != 0.0))
        .count();
    region.fill(0.0);
    touched
}
