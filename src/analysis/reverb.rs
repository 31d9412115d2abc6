//! Reverb depth
//!
//! A pushed-back, reverberant source has less variation in its RMS envelope;
//! depth is the ratio of a low percentile to a high percentile of that
//! envelope. Forwardness is the complement.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::stats::{percentile, windowed_rms, FLOOR};
use serde::Serialize;

const ENVELOPE_FRAME: usize = 2048;
const ENVELOPE_HOP: usize = 512;

#[derive(Debug, Clone, Serialize)]
pub struct ReverbReport {
    pub depth_score: f64,
    pub forwardness_score: f64,
    pub note: String,
}

pub fn analyze_reverb(buffer: &AudioBuffer, advisories: &AdvisoryCatalog) -> ReverbReport {
    let mono = buffer.mono();
    let envelope = windowed_rms(&mono, ENVELOPE_FRAME, ENVELOPE_HOP);

    let high = percentile(&envelope, 85.0) + FLOOR;
    let low = percentile(&envelope, 15.0) + FLOOR;
    let depth_score = (low / high).min(1.0);
    let forwardness_score = (1.0 - depth_score).max(0.0);

    let note = if forwardness_score > 0.6 {
        advisories.vocal_forward.clone()
    } else {
        advisories.vocal_pushed_back.clone()
    };

    ReverbReport {
        depth_score,
        forwardness_score,
        note,
    }
}
