//! Internal silence normalization
//!
//! Each span's first voiced onset is pulled back to the start of its slot by
//! shortening (or lengthening) the silent gap in front of it. Later content
//! shifts with it, and the trailing silence absorbs the difference so the
//! buffer length never changes. Only silence is added or removed.

use std::ops::Range;
use tracing::warn;

use super::regions::RegionDetector;
use crate::audio::AudioBuffer;
use crate::span::Span;

/// Returns the number of gaps that were resized.
pub(crate) fn fix_gaps(
    buffer: &mut AudioBuffer,
    detector: &RegionDetector,
    spans: &[Span],
    tolerance_frames: usize,
) -> usize {
    let regions = detector.speech_regions(buffer);
    if regions.len() < 2 {
        return 0;
    }

    let sample_rate = buffer.sample_rate();
    let slots: Vec<Range<usize>> = spans.iter().map(|s| s.frame_range(sample_rate)).collect();
    let owner = |frame: usize| slots.iter().rposition(|slot| slot.contains(&frame));

    let ch = buffer.channels() as usize;
    let total = buffer.frames();
    let mut out: Vec<f32> = Vec::with_capacity(buffer.samples().len());
    let mut adjusted = 0;

    out.extend_from_slice(buffer.frame_slice(0..regions[0].end));

    for pair in regions.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let actual = next.start - prev.end;
        let written_end = out.len() / ch;

        let expected = match (owner(prev.end - 1), owner(next.start)) {
            (Some(a), Some(b)) if a != b => Some(slots[b].start.saturating_sub(written_end)),
            _ => None,
        };

        match expected {
            Some(expected) if expected.abs_diff(actual) > tolerance_frames => {
                out.resize(out.len() + expected * ch, 0.0);
                adjusted += 1;
            }
            _ => out.extend_from_slice(buffer.frame_slice(prev.end..next.start)),
        }
        out.extend_from_slice(buffer.frame_slice(next.clone()));
    }

    if adjusted == 0 {
        return 0;
    }

    let content_end = out.len() / ch;
    if content_end > total {
        warn!(
            "Gap normalization would push speech {} frames past the end, skipping",
            content_end - total
        );
        return 0;
    }

    let last_end = regions[regions.len() - 1].end;
    let tail = buffer.frame_slice(last_end..total);
    let room = (total - content_end) * ch;
    out.extend_from_slice(&tail[..tail.len().min(room)]);
    out.resize(total * ch, 0.0);

    buffer.replace_samples(out);
    adjusted
}
