//! Removal of short, low-energy synthesis artifacts

use super::regions::RegionDetector;
use crate::audio::AudioBuffer;

/// Replace every artifact region with silence of the same length.
pub(crate) fn remove_artifacts(buffer: &mut AudioBuffer, detector: &RegionDetector) -> usize {
    let artifacts = detector.artifacts(buffer);
    let ch = buffer.channels() as usize;
    let samples = buffer.samples_mut();
    for region in &artifacts {
        samples[region.start * ch..region.end * ch].fill(0.0);
    }
    artifacts.len()
}
