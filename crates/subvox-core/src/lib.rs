//! Subvox Core - Subtitle-Synchronized Speech Assembly
//!
//! This crate turns a sequence of timed subtitle spans into a single audio
//! track where each span's synthesized speech sits inside its time slot.
//!
//! # Architecture
//!
//! - Spans are validated up front; structural problems abort the run
//! - Each span is synthesized independently (bounded concurrency); a failed
//!   span degrades to silence and a warning instead of failing the run
//! - The timeline assembler fits every segment to its slot by padding,
//!   stretching or truncating, and places it at the span's start time
//! - Optional post-processing trims edges, normalizes gaps and removes
//!   unvoiced artifacts without changing the track length
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use subvox_core::{Pipeline, PipelineConfig, PythonSynthesizer, Span, VoiceParameters};
//!
//! let spans = vec![
//!     Span::new(1, 0.0, 3.0, "Hello world")?,
//!     Span::new(2, 5.0, 8.0, "Second")?,
//! ];
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(PythonSynthesizer::new()))?;
//! let output = pipeline.run(&spans, &VoiceParameters::default()).await?;
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod postprocess;
pub mod span;
pub mod synthesis;
pub mod timeline;

pub use audio::{AudioBuffer, AudioEncoder, AudioFormat, TimeStretch, WavEncoder};
pub use config::{PipelineConfig, PostProcessConfig};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutput, RenderedTimeline};
pub use postprocess::{PostProcessReport, PostProcessor};
pub use span::{validate_spans, Span};
pub use synthesis::{
    PythonSynthesizer, SegmentOutcome, SegmentSynthesizer, SegmentWarning, SpeechSynthesizer,
    ToneSynthesizer, VoiceParameters,
};
pub use timeline::{FitKind, Placement, Timeline, TimelineAssembler};
