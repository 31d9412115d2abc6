//! Stereo field metrics
//!
//! Mid/side decomposition, width ratio, channel correlation, and a mono
//! compatibility score that only penalizes out-of-phase content.

use crate::analysis::buffer::AudioBuffer;
use crate::analysis::stats::{mean_square, pearson, FLOOR};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StereoMetrics {
    /// Side-to-mid energy ratio; 0 for mono-identical content
    pub width: f64,
    /// Pearson correlation of left and right, in [-1, 1]
    pub correlation: f64,
    /// 1 − max(0, −correlation); positive correlation never reduces it
    pub mono_compatibility: f64,
}

pub fn compute_stereo(buffer: &AudioBuffer) -> StereoMetrics {
    let (mid, side) = match buffer.mid_side() {
        Some(pair) => pair,
        // Mono input short-circuits regardless of content
        None => {
            return StereoMetrics {
                width: 0.0,
                correlation: 1.0,
                mono_compatibility: 1.0,
            }
        }
    };

    let mid_energy = mean_square(&mid);
    let side_energy = mean_square(&side);
    let width = side_energy / (mid_energy + FLOOR);

    let left = buffer.channel(0);
    let right = buffer.channel(1);
    let correlation = pearson(&left, &right);
    let mono_compatibility = 1.0 - (-correlation).max(0.0);

    StereoMetrics {
        width,
        correlation,
        mono_compatibility,
    }
}
