//! Speech synthesis capabilities and the per-span adapter

mod adapter;
mod params;
mod python_bridge;
mod tone;

pub use adapter::{SegmentOutcome, SegmentSynthesizer, SegmentWarning, SpeechSynthesizer};
pub use params::VoiceParameters;
pub use python_bridge::PythonSynthesizer;
pub use tone::ToneSynthesizer;
