//! Python bridge for speech synthesis
//! Runs a TTS inference script per segment and reads back base64 WAV audio

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use super::adapter::SpeechSynthesizer;
use super::params::VoiceParameters;
use crate::audio::{decode_wav, AudioBuffer};
use crate::error::{Error, Result};

/// Request to the Python inference script
#[derive(Debug, Serialize)]
struct PythonTtsRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exaggeration: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cfg_weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl<'a> PythonTtsRequest<'a> {
    fn check() -> Self {
        Self {
            command: "check",
            text: None,
            voice: None,
            language: None,
            temperature: None,
            exaggeration: None,
            cfg_weight: None,
            seed: None,
        }
    }

    fn generate(text: &'a str, params: &'a VoiceParameters) -> Self {
        Self {
            command: "generate",
            text: Some(text),
            voice: params.voice.as_deref(),
            language: params.language.as_deref(),
            temperature: params.temperature,
            exaggeration: params.exaggeration,
            cfg_weight: params.cfg_weight,
            seed: params.seed,
        }
    }
}

/// Response from the Python inference script
#[derive(Debug, Deserialize)]
struct PythonTtsResponse {
    audio_base64: Option<String>,
    error: Option<String>,
    status: Option<String>,
}

/// Synthesizer backed by a Python TTS script speaking JSON over stdio.
#[derive(Debug, Clone)]
pub struct PythonSynthesizer {
    script_path: PathBuf,
    python_cmd: String,
}

impl PythonSynthesizer {
    /// Bridge to `scripts/tts_inference.py` under the working directory.
    pub fn new() -> Self {
        let script_path = std::env::current_dir()
            .map(|p| p.join("scripts/tts_inference.py"))
            .unwrap_or_else(|_| "scripts/tts_inference.py".into());

        Self {
            script_path,
            python_cmd: "python3".to_string(),
        }
    }

    pub fn with_script(mut self, script_path: impl AsRef<Path>) -> Self {
        self.script_path = script_path.as_ref().to_path_buf();
        self
    }

    pub fn with_python(mut self, python_cmd: impl Into<String>) -> Self {
        self.python_cmd = python_cmd.into();
        self
    }

    /// Check if the script and its dependencies are available
    pub fn check_dependencies(&self) -> bool {
        let request = match serde_json::to_string(&PythonTtsRequest::check()) {
            Ok(json) => json,
            Err(_) => return false,
        };

        match self.call_python(&request) {
            Ok(response) if response.status.as_deref() == Some("ok") => true,
            Ok(response) => {
                if let Some(err) = response.error {
                    warn!("Python TTS dependencies not available: {}", err);
                }
                false
            }
            Err(e) => {
                warn!("Failed to check Python TTS dependencies: {}", e);
                false
            }
        }
    }

    /// Call Python script with JSON request
    fn call_python(&self, request_json: &str) -> Result<PythonTtsResponse> {
        let mut child = Command::new(&self.python_cmd)
            .arg(&self.script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::SynthesisError(format!("Failed to start Python: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request_json.as_bytes()).map_err(|e| {
                Error::SynthesisError(format!("Failed to write to Python: {}", e))
            })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::SynthesisError(format!("Python process failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::SynthesisError(format!(
                "Python error: {}",
                stderr.trim()
            )));
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for PythonSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for PythonSynthesizer {
    fn synthesize(&self, text: &str, params: &VoiceParameters) -> Result<AudioBuffer> {
        info!("Calling Python TTS for {} chars", text.chars().count());

        let request_json = serde_json::to_string(&PythonTtsRequest::generate(text, params))?;
        let response = self.call_python(&request_json)?;

        if let Some(err) = response.error {
            return Err(Error::SynthesisError(format!("Python TTS error: {}", err)));
        }

        let audio_b64 = response
            .audio_base64
            .ok_or_else(|| Error::SynthesisError("No audio in response".to_string()))?;

        let wav_bytes = base64::engine::general_purpose::STANDARD
            .decode(audio_b64.trim())
            .map_err(|e| Error::SynthesisError(format!("Failed to decode audio: {}", e)))?;

        let buffer = decode_wav(&wav_bytes)
            .map_err(|e| Error::SynthesisError(e.to_string()))?;

        debug!(
            "Generated {} frames at {} Hz",
            buffer.frames(),
            buffer.sample_rate()
        );
        Ok(buffer)
    }
}

/// Extract the JSON response line; model libraries often print banners first.
fn parse_response(stdout: &str) -> Result<PythonTtsResponse> {
    let json_str = stdout
        .lines()
        .find(|line| line.trim_start().starts_with('{'))
        .unwrap_or(stdout);

    serde_json::from_str(json_str).map_err(|e| {
        Error::SynthesisError(format!(
            "Failed to parse Python response: {} - {}",
            e,
            json_str.trim()
        ))
    })
}
