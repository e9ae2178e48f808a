//! Configuration types for the subvox pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::AudioFormat;
use crate::error::{Error, Result};
use crate::timeline::DEFAULT_MAX_TIMELINE_SECS;

/// Lowest and highest output sample rates accepted.
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sample rate of the assembled timeline
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count of the assembled timeline
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Container format handed to the encoder
    #[serde(default)]
    pub output_format: AudioFormat,

    /// Stretch over-long segments into their slot instead of truncating them
    #[serde(default = "default_stretch_available")]
    pub stretch_available: bool,

    /// Maximum synthesis calls in flight at once
    #[serde(default = "default_max_concurrent_synthesis")]
    pub max_concurrent_synthesis: usize,

    /// Per-segment synthesis timeout; a timeout degrades that segment to silence
    #[serde(default)]
    pub segment_timeout_ms: Option<u64>,

    /// Longest timeline accepted; spans ending later are rejected up front
    #[serde(default = "default_max_timeline_secs")]
    pub max_timeline_secs: f64,

    #[serde(default)]
    pub postprocess: PostProcessConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            output_format: AudioFormat::default(),
            stretch_available: default_stretch_available(),
            max_concurrent_synthesis: default_max_concurrent_synthesis(),
            segment_timeout_ms: None,
            max_timeline_secs: default_max_timeline_secs(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(Error::ConfigError(format!(
                "sample rate {} Hz outside {}..={} Hz",
                self.sample_rate,
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            )));
        }
        if self.channels == 0 {
            return Err(Error::ConfigError("channels must be at least 1".to_string()));
        }
        if self.max_concurrent_synthesis == 0 {
            return Err(Error::ConfigError(
                "max_concurrent_synthesis must be at least 1".to_string(),
            ));
        }
        if self.segment_timeout_ms == Some(0) {
            return Err(Error::ConfigError(
                "segment_timeout_ms must be positive when set".to_string(),
            ));
        }
        if !self.max_timeline_secs.is_finite() || self.max_timeline_secs <= 0.0 {
            return Err(Error::ConfigError(
                "max_timeline_secs must be a positive number of seconds".to_string(),
            ));
        }
        self.postprocess.validate()
    }
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_channels() -> u16 {
    1
}

fn default_stretch_available() -> bool {
    true
}

fn default_max_concurrent_synthesis() -> usize {
    get_num_cpus().min(4)
}

fn default_max_timeline_secs() -> f64 {
    DEFAULT_MAX_TIMELINE_SECS
}

/// Post-processing passes and their thresholds.
///
/// Every pass is off unless enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessConfig {
    /// Zero leading and trailing silence outside a guard band
    #[serde(default)]
    pub trim_silence: bool,

    /// Realign silence between spans with their timestamps
    #[serde(default)]
    pub fix_internal_silence: bool,

    /// Excise short low-energy artifacts
    #[serde(default)]
    pub remove_unvoiced: bool,

    /// Peak amplitude at or above which a frame counts as voiced
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,

    /// Silence kept next to voiced audio when trimming
    #[serde(default = "default_guard_ms")]
    pub guard_ms: u32,

    /// Shortest pause that separates two voiced regions
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_ms: u32,

    /// Allowed deviation of a gap from its expected length
    #[serde(default = "default_gap_tolerance_ms")]
    pub gap_tolerance_ms: u32,

    /// Longest region that may be classified as an artifact
    #[serde(default = "default_max_artifact_ms")]
    pub max_artifact_ms: u32,

    /// RMS below which a short region is an artifact
    #[serde(default = "default_artifact_rms_threshold")]
    pub artifact_rms_threshold: f32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            trim_silence: false,
            fix_internal_silence: false,
            remove_unvoiced: false,
            silence_threshold: default_silence_threshold(),
            guard_ms: default_guard_ms(),
            min_silence_ms: default_min_silence_ms(),
            gap_tolerance_ms: default_gap_tolerance_ms(),
            max_artifact_ms: default_max_artifact_ms(),
            artifact_rms_threshold: default_artifact_rms_threshold(),
        }
    }
}

impl PostProcessConfig {
    /// All passes enabled with default thresholds.
    pub fn all() -> Self {
        Self {
            trim_silence: true,
            fix_internal_silence: true,
            remove_unvoiced: true,
            ..Default::default()
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.trim_silence || self.fix_internal_silence || self.remove_unvoiced
    }

    pub fn validate(&self) -> Result<()> {
        if !self.silence_threshold.is_finite() || self.silence_threshold <= 0.0 {
            return Err(Error::ConfigError(
                "silence_threshold must be a positive amplitude".to_string(),
            ));
        }
        if !self.artifact_rms_threshold.is_finite() || self.artifact_rms_threshold < 0.0 {
            return Err(Error::ConfigError(
                "artifact_rms_threshold must be non-negative".to_string(),
            ));
        }
        if self.min_silence_ms == 0 {
            return Err(Error::ConfigError(
                "min_silence_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_silence_threshold() -> f32 {
    0.01
}

fn default_guard_ms() -> u32 {
    50
}

fn default_min_silence_ms() -> u32 {
    100
}

fn default_gap_tolerance_ms() -> u32 {
    20
}

fn default_max_artifact_ms() -> u32 {
    60
}

fn default_artifact_rms_threshold() -> f32 {
    0.03
}

fn get_num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
