//! Audio buffers, resampling and output encoding

mod buffer;
mod encoder;
mod resample;
mod stretch;

pub use buffer::{frames_to_secs, secs_to_frames, AudioBuffer};
pub use encoder::{decode_wav, AudioEncoder, AudioFormat, WavEncoder};
pub use resample::{convert_rate, resample_to_frames};
pub use stretch::{apply_speed, ResampleStretch, TimeStretch};
