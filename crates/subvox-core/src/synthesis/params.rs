//! Voice parameters forwarded to the synthesis capability

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{Error, Result};

const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
const EXAGGERATION_RANGE: RangeInclusive<f32> = 0.0..=2.0;
const CFG_WEIGHT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const SPEED_FACTOR_RANGE: RangeInclusive<f32> = 0.25..=4.0;

/// Options shared by every span of one run.
///
/// Unset values fall back to whatever the synthesis engine defaults to. Only
/// `speed_factor` is interpreted locally, and only when the engine does not
/// apply it itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    /// Engine-specific voice identifier (predefined voice or reference clip)
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub exaggeration: Option<f32>,

    /// Classifier-free guidance strength
    #[serde(default)]
    pub cfg_weight: Option<f32>,

    /// Same seed, text and voice reproduce the same audio
    #[serde(default)]
    pub seed: Option<u64>,

    /// Playback-rate multiplier applied per segment before placement
    #[serde(default)]
    pub speed_factor: Option<f32>,

    #[serde(default)]
    pub language: Option<String>,
}

impl VoiceParameters {
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_speed_factor(mut self, speed: f32) -> Self {
        self.speed_factor = Some(speed);
        self
    }

    /// Effective speed multiplier.
    pub fn speed(&self) -> f32 {
        self.speed_factor.unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_range("exaggeration", self.exaggeration, EXAGGERATION_RANGE)?;
        check_range("cfg_weight", self.cfg_weight, CFG_WEIGHT_RANGE)?;
        check_range("speed_factor", self.speed_factor, SPEED_FACTOR_RANGE)?;
        if matches!(&self.voice, Some(v) if v.trim().is_empty()) {
            return Err(Error::ConfigError("voice must not be blank".to_string()));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: Option<f32>, range: RangeInclusive<f32>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || !range.contains(&v) => Err(Error::ConfigError(format!(
            "{name} {v} outside {}..={}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}
