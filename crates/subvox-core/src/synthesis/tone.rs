//! Deterministic tone synthesizer for dry runs

use super::adapter::SpeechSynthesizer;
use super::params::VoiceParameters;
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

/// Renders each text as a sine tone.
///
/// Length grows with the character count; pitch is derived from the seed, so
/// the same text and seed always produce identical samples.
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    secs_per_char: f64,
    amplitude: f32,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            secs_per_char: 0.06,
            amplitude: 0.3,
        }
    }

    pub fn with_secs_per_char(mut self, secs: f64) -> Self {
        self.secs_per_char = secs;
        self
    }

    /// Duration the tone for `text` will have.
    pub fn duration_for(&self, text: &str) -> f64 {
        text.chars().filter(|c| !c.is_whitespace()).count() as f64 * self.secs_per_char
    }
}

impl SpeechSynthesizer for ToneSynthesizer {
    fn synthesize(&self, text: &str, params: &VoiceParameters) -> Result<AudioBuffer> {
        let frames = (self.duration_for(text) * self.sample_rate as f64).round() as usize;
        if frames == 0 {
            return Err(Error::SynthesisError(format!(
                "nothing to voice in {text:?}"
            )));
        }

        let freq = 220.0 + (params.seed.unwrap_or(0) % 100) as f32 * 5.0;
        let samples = (0..frames)
            .map(|i| {
                let time = i as f32 / self.sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * time).sin() * self.amplitude
            })
            .collect();

        AudioBuffer::mono(samples, self.sample_rate)
    }
}
