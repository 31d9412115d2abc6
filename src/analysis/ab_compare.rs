//! A/B comparison against a reference track
//!
//! Pure function of two metric summaries. Fixed thresholds drive both the
//! categorical summaries and the suggestion list: tilt at +-0.6 dB/oct,
//! stereo width at +-0.2, dynamics at +-2 dB, and a phase-correlation
//! warning at |diff| > 0.1. The suggestion list is never empty; when no
//! threshold triggers it holds the single "close to reference" fallback.

use crate::analysis::advisories::AdvisoryCatalog;
use serde::Serialize;

const TILT_THRESHOLD: f64 = 0.6;
const WIDTH_THRESHOLD: f64 = 0.2;
const DYNAMICS_THRESHOLD: f64 = 2.0;
const PHASE_THRESHOLD: f64 = 0.1;
const LOUDNESS_THRESHOLD: f64 = 1.0;

/// The subset of measurements the comparator consumes, for one track
#[derive(Debug, Clone, Copy)]
pub struct MetricSummary {
    pub integrated_lufs: f64,
    pub short_term_lufs: f64,
    pub true_peak_db: f64,
    pub crest_factor_db: f64,
    pub spectral_tilt_db_per_oct: f64,
    pub stereo_width: f64,
    pub stereo_correlation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbComparison {
    pub loudness_diff_lufs: f64,
    pub short_term_diff_lufs: f64,
    pub true_peak_diff_db: f64,
    pub spectral_diff_summary: String,
    pub stereo_diff_summary: String,
    pub phase_corr_diff: f64,
    pub dynamics_diff_summary: String,
    pub match_suggestions: Vec<String>,
}

pub fn compare_ab(
    mix: &MetricSummary,
    reference: &MetricSummary,
    advisories: &AdvisoryCatalog,
) -> AbComparison {
    let loudness_diff = mix.integrated_lufs - reference.integrated_lufs;
    let short_term_diff = mix.short_term_lufs - reference.short_term_lufs;
    let true_peak_diff = mix.true_peak_db - reference.true_peak_db;
    let spectral_diff = mix.spectral_tilt_db_per_oct - reference.spectral_tilt_db_per_oct;
    let stereo_diff = mix.stereo_width - reference.stereo_width;
    let phase_corr_diff = mix.stereo_correlation - reference.stereo_correlation;
    let dynamics_diff = mix.crest_factor_db - reference.crest_factor_db;

    let spectral_summary = if spectral_diff > TILT_THRESHOLD {
        advisories.ab_brighter.clone()
    } else if spectral_diff < -TILT_THRESHOLD {
        advisories.ab_darker.clone()
    } else {
        advisories.ab_tilt_close.clone()
    };

    let mut stereo_summary = if stereo_diff > WIDTH_THRESHOLD {
        advisories.ab_wider.clone()
    } else if stereo_diff < -WIDTH_THRESHOLD {
        advisories.ab_narrower.clone()
    } else {
        advisories.ab_width_close.clone()
    };
    if phase_corr_diff.abs() > PHASE_THRESHOLD {
        stereo_summary.push(' ');
        stereo_summary.push_str(&advisories.ab_phase_differs);
    }

    let dynamics_summary = if dynamics_diff > DYNAMICS_THRESHOLD {
        advisories.ab_more_dynamic.clone()
    } else if dynamics_diff < -DYNAMICS_THRESHOLD {
        advisories.ab_more_compressed.clone()
    } else {
        advisories.ab_dynamics_close.clone()
    };

    let mut suggestions = Vec::new();
    if loudness_diff < -LOUDNESS_THRESHOLD {
        suggestions.push(advisories.ab_raise_loudness.clone());
    } else if loudness_diff > LOUDNESS_THRESHOLD {
        suggestions.push(advisories.ab_lower_loudness.clone());
    }
    if true_peak_diff > LOUDNESS_THRESHOLD {
        suggestions.push(advisories.ab_lower_true_peak.clone());
    }
    if spectral_diff > TILT_THRESHOLD {
        suggestions.push(advisories.ab_tame_highs.clone());
    } else if spectral_diff < -TILT_THRESHOLD {
        suggestions.push(advisories.ab_add_air.clone());
    }
    if stereo_diff > WIDTH_THRESHOLD {
        suggestions.push(advisories.ab_narrow_width.clone());
    } else if stereo_diff < -WIDTH_THRESHOLD {
        suggestions.push(advisories.ab_widen.clone());
    }
    if dynamics_diff < -DYNAMICS_THRESHOLD {
        suggestions.push(advisories.ab_ease_compression.clone());
    }
    if suggestions.is_empty() {
        suggestions.push(advisories.ab_close_to_reference.clone());
    }

    AbComparison {
        loudness_diff_lufs: loudness_diff,
        short_term_diff_lufs: short_term_diff,
        true_peak_diff_db: true_peak_diff,
        spectral_diff_summary: spectral_summary,
        stereo_diff_summary: stereo_summary,
        phase_corr_diff,
        dynamics_diff_summary: dynamics_summary,
        match_suggestions: suggestions,
    }
}
