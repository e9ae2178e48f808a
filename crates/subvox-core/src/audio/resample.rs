//! Band-limited resampling to an exact output length
//!
//! All rate conversion and time scaling in the crate goes through
//! [`resample_to_frames`], which wraps rubato's sinc resampler and compensates
//! for its output delay so the result starts aligned with the input.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use super::buffer::AudioBuffer;
use crate::error::Result;

/// Upper bound on flush iterations when draining the resampler tail.
const MAX_FLUSHES: usize = 64;

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resample `buffer` so it holds exactly `target_frames` frames.
///
/// The sample rate tag is set to `sample_rate`; callers converting rates pass
/// the new rate, callers time-scaling pass the buffer's own rate.
pub fn resample_to_frames(
    buffer: &AudioBuffer,
    target_frames: usize,
    sample_rate: u32,
) -> Result<AudioBuffer> {
    let channels = buffer.channels();
    let in_frames = buffer.frames();

    if in_frames == 0 || target_frames == 0 {
        return AudioBuffer::silence_frames(target_frames, sample_rate, channels);
    }
    if in_frames == target_frames {
        return AudioBuffer::new(buffer.samples().to_vec(), sample_rate, channels);
    }

    let ratio = target_frames as f64 / in_frames as f64;
    let planes = buffer.deinterleave();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_params(), in_frames, planes.len())?;
    let delay = resampler.output_delay();
    let needed = delay + target_frames;

    let mut out = resampler.process(&planes[..], None)?;
    let mut flushes = 0;
    while out[0].len() < needed && flushes < MAX_FLUSHES {
        let tail = resampler.process_partial(None::<&[Vec<f32>]>, None)?;
        for (plane, more) in out.iter_mut().zip(tail) {
            plane.extend(more);
        }
        flushes += 1;
    }

    for plane in out.iter_mut() {
        plane.drain(..delay.min(plane.len()));
        plane.resize(target_frames, 0.0);
    }

    debug!(
        "Resampled {} -> {} frames (ratio {:.4}, {} flushes)",
        in_frames, target_frames, ratio, flushes
    );

    AudioBuffer::interleave(&out, sample_rate)
}

/// Convert `buffer` to a new sample rate, keeping its duration.
pub fn convert_rate(buffer: &AudioBuffer, sample_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate() == sample_rate {
        return Ok(buffer.clone());
    }
    let target = (buffer.frames() as f64 * sample_rate as f64 / buffer.sample_rate() as f64)
        .round() as usize;
    resample_to_frames(buffer, target, sample_rate)
}
