//! Per-span synthesis with silence fallback
//!
//! The adapter never fails: a span either yields synthesized audio, deliberate
//! silence for blank text, or degraded silence tagged with the failure reason.
//! Every returned buffer is already at the pipeline's rate and channel count.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::params::VoiceParameters;
use crate::audio::{apply_speed, convert_rate, AudioBuffer, ResampleStretch, TimeStretch};
use crate::error::Result;
use crate::span::Span;

/// External text-to-speech capability.
///
/// Implementations are shared across worker threads and must be stateless
/// with respect to any one pipeline run.
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to audio. Any error is treated as a synthesis failure.
    fn synthesize(&self, text: &str, params: &VoiceParameters) -> Result<AudioBuffer>;

    /// Whether `params.speed_factor` is already honoured by `synthesize`.
    fn applies_speed_factor(&self) -> bool {
        false
    }
}

/// Non-fatal diagnostic for a span that fell back to silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentWarning {
    pub span_index: u32,
    pub reason: String,
}

impl fmt::Display for SegmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "span {}: {}", self.span_index, self.reason)
    }
}

/// Result of synthesizing one span.
#[derive(Debug, Clone)]
pub enum SegmentOutcome {
    Synthesized(AudioBuffer),
    /// Blank text; the engine was not called
    Silent(AudioBuffer),
    Degraded { buffer: AudioBuffer, reason: String },
}

impl SegmentOutcome {
    pub fn buffer(&self) -> &AudioBuffer {
        match self {
            SegmentOutcome::Synthesized(buffer)
            | SegmentOutcome::Silent(buffer)
            | SegmentOutcome::Degraded { buffer, .. } => buffer,
        }
    }

    pub fn into_buffer(self) -> AudioBuffer {
        match self {
            SegmentOutcome::Synthesized(buffer)
            | SegmentOutcome::Silent(buffer)
            | SegmentOutcome::Degraded { buffer, .. } => buffer,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SegmentOutcome::Degraded { .. })
    }

    pub fn warning(&self, span_index: u32) -> Option<SegmentWarning> {
        match self {
            SegmentOutcome::Degraded { reason, .. } => Some(SegmentWarning {
                span_index,
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

/// Wraps a [`SpeechSynthesizer`] with uniform failure handling.
#[derive(Clone)]
pub struct SegmentSynthesizer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    stretcher: Arc<dyn TimeStretch>,
    sample_rate: u32,
    channels: u16,
}

impl SegmentSynthesizer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, sample_rate: u32, channels: u16) -> Self {
        Self {
            synthesizer,
            stretcher: Arc::new(ResampleStretch),
            sample_rate,
            channels,
        }
    }

    /// Replace the stretcher used for speed-factor scaling.
    pub fn with_stretcher(mut self, stretcher: Arc<dyn TimeStretch>) -> Self {
        self.stretcher = stretcher;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Synthesize one span; failures degrade to silence of the span's length.
    pub fn synthesize_segment(&self, span: &Span, params: &VoiceParameters) -> SegmentOutcome {
        if span.is_blank() {
            debug!("Span {} has no text, emitting silence", span.index());
            return SegmentOutcome::Silent(self.silence_for(span));
        }

        let result = self
            .synthesizer
            .synthesize(span.text(), params)
            .and_then(|buffer| self.conform(buffer, params));

        match result {
            Ok(buffer) => {
                debug!(
                    "Span {} synthesized: {:.3}s for a {:.3}s slot",
                    span.index(),
                    buffer.duration_secs(),
                    span.duration()
                );
                SegmentOutcome::Synthesized(buffer)
            }
            Err(e) => self.degraded(span, e.to_string()),
        }
    }

    /// Silence standing in for a span that could not be synthesized.
    pub fn degraded(&self, span: &Span, reason: impl Into<String>) -> SegmentOutcome {
        let reason = reason.into();
        warn!("Span {} degraded to silence: {}", span.index(), reason);
        SegmentOutcome::Degraded {
            buffer: self.silence_for(span),
            reason,
        }
    }

    /// Silence for the span's slot. A slot too large to allocate yields an
    /// empty buffer; the assembler pads short segments with silence anyway.
    fn silence_for(&self, span: &Span) -> AudioBuffer {
        let range = span.frame_range(self.sample_rate);
        AudioBuffer::silence_frames(range.len(), self.sample_rate, self.channels)
            .unwrap_or_else(|e| {
                warn!("Span {} silence left to the assembler: {}", span.index(), e);
                AudioBuffer::empty(self.sample_rate, self.channels)
            })
    }

    /// Bring an engine buffer to the pipeline layout and apply speed.
    fn conform(&self, buffer: AudioBuffer, params: &VoiceParameters) -> Result<AudioBuffer> {
        let buffer = if buffer.channels() == self.channels {
            buffer
        } else {
            buffer.with_channels(self.channels)
        };
        let buffer = convert_rate(&buffer, self.sample_rate)?;

        if self.synthesizer.applies_speed_factor() {
            Ok(buffer)
        } else {
            apply_speed(self.stretcher.as_ref(), &buffer, params.speed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FixedSynth {
        frames: usize,
        sample_rate: u32,
    }

    impl SpeechSynthesizer for FixedSynth {
        fn synthesize(&self, _text: &str, _params: &VoiceParameters) -> Result<AudioBuffer> {
            AudioBuffer::mono(vec![0.5; self.frames], self.sample_rate)
        }
    }

    /// Honours the speed factor itself, like engines with native tempo control.
    struct SpeedAwareSynth;

    impl SpeechSynthesizer for SpeedAwareSynth {
        fn synthesize(&self, _text: &str, params: &VoiceParameters) -> Result<AudioBuffer> {
            let frames = (16000.0 / params.speed()).round() as usize;
            AudioBuffer::mono(vec![0.5; frames], 16000)
        }

        fn applies_speed_factor(&self) -> bool {
            true
        }
    }

    struct FailingSynth;

    impl SpeechSynthesizer for FailingSynth {
        fn synthesize(&self, _text: &str, _params: &VoiceParameters) -> Result<AudioBuffer> {
            Err(Error::SynthesisError("engine not loaded".to_string()))
        }
    }

    fn adapter(synth: impl SpeechSynthesizer + 'static) -> SegmentSynthesizer {
        SegmentSynthesizer::new(Arc::new(synth), 16000, 1)
    }

    #[test]
    fn test_blank_span_is_silent_without_engine_call() {
        let span = Span::new(1, 1.0, 2.5, "").unwrap();
        let outcome = adapter(FailingSynth).synthesize_segment(&span, &VoiceParameters::default());
        assert!(matches!(outcome, SegmentOutcome::Silent(_)));
        assert_eq!(outcome.buffer().frames(), 24000);
        assert!(outcome.buffer().is_silent());
        assert!(outcome.warning(1).is_none());
    }

    #[test]
    fn test_failure_degrades_to_silence() {
        let span = Span::new(7, 0.0, 2.0, "hello").unwrap();
        let outcome = adapter(FailingSynth).synthesize_segment(&span, &VoiceParameters::default());
        assert!(outcome.is_degraded());
        assert_eq!(outcome.buffer().frames(), 32000);
        assert!(outcome.buffer().is_silent());

        let warning = outcome.warning(7).unwrap();
        assert_eq!(warning.span_index, 7);
        assert!(warning.reason.contains("engine not loaded"));
    }

    #[test]
    fn test_speed_factor_applied_locally() {
        let span = Span::new(1, 0.0, 5.0, "hi").unwrap();
        let params = VoiceParameters::default().with_speed_factor(2.0);
        let outcome = adapter(FixedSynth {
            frames: 16000,
            sample_rate: 16000,
        })
        .synthesize_segment(&span, &params);
        assert_eq!(outcome.buffer().frames(), 8000);
    }

    #[test]
    fn test_engine_speed_factor_not_applied_twice() {
        let span = Span::new(1, 0.0, 5.0, "hi").unwrap();
        let params = VoiceParameters::default().with_speed_factor(2.0);
        let outcome = adapter(SpeedAwareSynth).synthesize_segment(&span, &params);
        assert!(matches!(outcome, SegmentOutcome::Synthesized(_)));
        assert_eq!(outcome.buffer().frames(), 8000);
    }

    #[test]
    fn test_rate_is_converted() {
        let span = Span::new(1, 0.0, 5.0, "hi").unwrap();
        let outcome = adapter(FixedSynth {
            frames: 24000,
            sample_rate: 24000,
        })
        .synthesize_segment(&span, &VoiceParameters::default());
        assert!(matches!(outcome, SegmentOutcome::Synthesized(_)));
        assert_eq!(outcome.buffer().sample_rate(), 16000);
        assert_eq!(outcome.buffer().frames(), 16000);
    }
}
