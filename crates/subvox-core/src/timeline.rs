//! Timeline assembly
//!
//! Places one synthesized segment per span on a silent canvas whose length is
//! fixed up front from the latest span end. Each segment is fitted to its
//! slot before placement:
//! - exact (within one frame): copied verbatim
//! - too short: copied, rest of the slot left silent
//! - too long: stretched to the slot when a stretcher is configured,
//!   otherwise truncated to the slot
//!
//! Placement runs in span order. A span owns its whole slot, so where slots
//! overlap the later span's samples (including its padding) win.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio::{secs_to_frames, AudioBuffer, TimeStretch};
use crate::error::{Error, Result};
use crate::span::{timeline_end, Span};

/// Largest length difference, in frames, still treated as an exact fit.
pub const EXACT_FIT_TOLERANCE_FRAMES: usize = 1;

/// Longest timeline, in seconds, assembled unless configured otherwise.
pub const DEFAULT_MAX_TIMELINE_SECS: f64 = 6.0 * 3600.0;

/// How a segment was fitted to its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitKind {
    Exact,
    Padded,
    Stretched,
    Truncated,
}

/// Record of one segment placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub span_index: u32,
    /// First frame of the slot on the canvas
    pub offset_frames: usize,
    pub slot_frames: usize,
    /// Segment length before fitting
    pub source_frames: usize,
    /// Frames of segment audio actually written after canvas clipping
    pub written_frames: usize,
    pub fit: FitKind,
}

/// The assembled canvas and how it was filled.
#[derive(Debug, Clone)]
pub struct Timeline {
    buffer: AudioBuffer,
    placements: Vec<Placement>,
}

impl Timeline {
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn into_parts(self) -> (AudioBuffer, Vec<Placement>) {
        (self.buffer, self.placements)
    }

    pub fn into_buffer(self) -> AudioBuffer {
        self.buffer
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }
}

/// Builds the timeline canvas from spans and their segments.
#[derive(Clone)]
pub struct TimelineAssembler {
    sample_rate: u32,
    channels: u16,
    max_duration_secs: f64,
    stretcher: Option<Arc<dyn TimeStretch>>,
}

impl TimelineAssembler {
    /// Assembler that truncates over-long segments.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            max_duration_secs: DEFAULT_MAX_TIMELINE_SECS,
            stretcher: None,
        }
    }

    /// Refuse to assemble timelines ending after `secs`.
    pub fn with_max_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Stretch over-long segments into their slot with `stretcher`.
    pub fn with_stretcher(mut self, stretcher: Arc<dyn TimeStretch>) -> Self {
        self.stretcher = Some(stretcher);
        self
    }

    pub fn can_stretch(&self) -> bool {
        self.stretcher.is_some()
    }

    /// Place `segments[i]` at `spans[i]` on a fresh canvas.
    ///
    /// Segments must already be at the assembler's sample rate and channel
    /// count. The canvas spans `max(end)` and never grows.
    pub fn assemble(&self, spans: &[Span], segments: Vec<AudioBuffer>) -> Result<Timeline> {
        if spans.len() != segments.len() {
            return Err(Error::ConfigError(format!(
                "{} spans but {} segments",
                spans.len(),
                segments.len()
            )));
        }

        let end = timeline_end(spans);
        if end > self.max_duration_secs {
            return Err(Error::ConfigError(format!(
                "timeline ends at {:.3}s, longer than the {:.3}s limit",
                end, self.max_duration_secs
            )));
        }

        let total_frames = secs_to_frames(end, self.sample_rate);
        let mut canvas = AudioBuffer::silence_frames(total_frames, self.sample_rate, self.channels)?;
        let mut placements = Vec::with_capacity(spans.len());

        for (span, segment) in spans.iter().zip(segments) {
            if segment.sample_rate() != self.sample_rate || segment.channels() != self.channels {
                return Err(Error::ConfigError(format!(
                    "segment for span {} is {} Hz x{}, timeline is {} Hz x{}",
                    span.index(),
                    segment.sample_rate(),
                    segment.channels(),
                    self.sample_rate,
                    self.channels
                )));
            }
            let placement = self.place(&mut canvas, span, segment);
            debug!(
                "Span {} placed at frame {}: {:?} ({} -> {} of {} frames)",
                placement.span_index,
                placement.offset_frames,
                placement.fit,
                placement.source_frames,
                placement.written_frames,
                placement.slot_frames
            );
            placements.push(placement);
        }

        info!(
            "Assembled {} spans into {:.3}s timeline",
            placements.len(),
            canvas.duration_secs()
        );

        Ok(Timeline {
            buffer: canvas,
            placements,
        })
    }

    fn place(&self, canvas: &mut AudioBuffer, span: &Span, segment: AudioBuffer) -> Placement {
        let slot = span.frame_range(self.sample_rate);
        let slot_frames = slot.len();
        let source_frames = segment.frames();

        let (fitted, fit) = self.fit(span, segment, slot_frames);

        let ch = self.channels as usize;
        let canvas_frames = canvas.frames();
        let offset = slot.start.min(canvas_frames);
        let written = fitted.frames().min(slot_frames).min(canvas_frames - offset);
        let slot_end = slot.end.min(canvas_frames);

        let samples = canvas.samples_mut();
        samples[offset * ch..(offset + written) * ch]
            .copy_from_slice(fitted.frame_slice(0..written));
        if offset + written < slot_end {
            samples[(offset + written) * ch..slot_end * ch].fill(0.0);
        }

        Placement {
            span_index: span.index(),
            offset_frames: slot.start,
            slot_frames,
            source_frames,
            written_frames: written,
            fit,
        }
    }

    fn fit(&self, span: &Span, segment: AudioBuffer, slot_frames: usize) -> (AudioBuffer, FitKind) {
        let actual = segment.frames();

        if actual.abs_diff(slot_frames) <= EXACT_FIT_TOLERANCE_FRAMES {
            return (segment, FitKind::Exact);
        }
        if actual < slot_frames {
            return (segment, FitKind::Padded);
        }

        if let Some(stretcher) = &self.stretcher {
            match stretcher.stretch(&segment, slot_frames) {
                Ok(stretched) if stretched.frames() == slot_frames => {
                    return (stretched, FitKind::Stretched);
                }
                Ok(stretched) => warn!(
                    "Stretch for span {} returned {} frames instead of {}, truncating",
                    span.index(),
                    stretched.frames(),
                    slot_frames
                ),
                Err(e) => warn!("Stretch failed for span {}, truncating: {}", span.index(), e),
            }
        }

        (segment.truncated(slot_frames), FitKind::Truncated)
    }
}
