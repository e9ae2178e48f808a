//! Error types for the subvox timeline engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid span {index}: {reason}")]
    InvalidSpan { index: u32, reason: String },

    #[error("Synthesis failed: {0}")]
    SynthesisError(String),

    #[error("Audio encoding error: {0}")]
    EncodingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resampling error: {0}")]
    ResampleError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(String),
}

impl Error {
    pub(crate) fn invalid_span(index: u32, reason: impl Into<String>) -> Self {
        Error::InvalidSpan {
            index,
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a pipeline run rather than degrading one segment.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::SynthesisError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::TomlError(e.to_string())
    }
}

impl From<rubato::ResamplerConstructionError> for Error {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        Error::ResampleError(e.to_string())
    }
}

impl From<rubato::ResampleError> for Error {
    fn from(e: rubato::ResampleError) -> Self {
        Error::ResampleError(e.to_string())
    }
}
