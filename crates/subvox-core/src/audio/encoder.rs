//! Audio encoding to output container formats

use bytes::Bytes;
use hound::{WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

use super::buffer::AudioBuffer;
use super::resample::convert_rate;
use crate::error::{Error, Result};

/// Supported audio output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV format (16-bit PCM)
    #[default]
    Wav,
    /// Opus in an Ogg container
    Opus,
    /// MPEG layer III
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Opus => "opus",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// Get content type for format
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "opus" => Ok(AudioFormat::Opus),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(Error::ConfigError(format!(
                "Unsupported output format: {other}"
            ))),
        }
    }
}

/// Encodes a finished timeline into container bytes.
pub trait AudioEncoder: Send + Sync {
    /// Encode `buffer` as `format` at `sample_rate`.
    fn encode(&self, buffer: &AudioBuffer, format: AudioFormat, sample_rate: u32) -> Result<Bytes>;

    /// Whether `format` can be produced at all; checked before synthesis starts.
    fn supports(&self, format: AudioFormat) -> bool;
}

/// 16-bit PCM WAV encoder backed by `hound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn new() -> Self {
        Self
    }

    fn encode_wav(&self, buffer: &AudioBuffer) -> Result<Bytes> {
        let spec = WavSpec {
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::EncodingError(e.to_string()))?;

            for &sample in buffer.samples() {
                // Convert f32 [-1.0, 1.0] to i16
                let sample_i16 = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                writer
                    .write_sample(sample_i16)
                    .map_err(|e| Error::EncodingError(e.to_string()))?;
            }

            writer
                .finalize()
                .map_err(|e| Error::EncodingError(e.to_string()))?;
        }

        debug!(
            "Encoded {} frames to WAV ({} bytes)",
            buffer.frames(),
            cursor.get_ref().len()
        );
        Ok(Bytes::from(cursor.into_inner()))
    }
}

impl AudioEncoder for WavEncoder {
    fn encode(&self, buffer: &AudioBuffer, format: AudioFormat, sample_rate: u32) -> Result<Bytes> {
        if !self.supports(format) {
            return Err(Error::EncodingError(format!(
                "{} output requires an external codec",
                format.extension()
            )));
        }
        if buffer.sample_rate() == sample_rate {
            self.encode_wav(buffer)
        } else {
            let converted = convert_rate(buffer, sample_rate)
                .map_err(|e| Error::EncodingError(e.to_string()))?;
            self.encode_wav(&converted)
        }
    }

    fn supports(&self, format: AudioFormat) -> bool {
        format == AudioFormat::Wav
    }
}

/// Parse WAV bytes into a buffer, keeping the file's rate and channel layout.
pub fn decode_wav(wav_bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_bytes))
        .map_err(|e| Error::EncodingError(format!("Failed to parse WAV: {}", e)))?;

    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<Vec<f32>, hound::Error>>()
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
    }
    .map_err(|e| Error::EncodingError(format!("Failed to read WAV samples: {}", e)))?;

    AudioBuffer::new(samples, spec.sample_rate, spec.channels)
}
