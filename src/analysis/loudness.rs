//! Loudness and dynamics metrics
//!
//! Integrated loudness uses the standard BS.1770 gating; short-term
//! character is the 90th percentile of a 3 s / 1 s hop window series, which
//! tracks "loud but not momentary-peak" better than a plain maximum. True
//! peak is measured after 4x oversampling to catch inter-sample peaks.

use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, LoudnessMeter};
use crate::analysis::stats::{db, percentile, rms, windowed_rms, FLOOR};
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

/// Floor for gated loudness on silent or near-silent material
const LOUDNESS_FLOOR_LUFS: f64 = -70.0;

#[derive(Debug, Clone, Serialize)]
pub struct LoudnessMetrics {
    pub integrated_lufs: f64,
    pub short_term_lufs: f64,
    pub true_peak_db: f64,
    pub sample_peak_db: f64,
    pub crest_factor_db: f64,
    pub dynamic_range_db: f64,
    pub noise_floor_db: f64,
}

pub struct LoudnessAnalyzer {
    meter: Arc<dyn LoudnessMeter>,
}

impl LoudnessAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            meter: caps.loudness()?,
        })
    }

    pub fn analyze(&self, buffer: &AudioBuffer) -> AnalysisResult<LoudnessMetrics> {
        let integrated = self
            .meter
            .integrated_lufs(buffer)?
            .max(LOUDNESS_FLOOR_LUFS);

        let series = self.meter.short_term_series(buffer)?;
        let short_term = if series.is_empty() {
            integrated
        } else {
            percentile(&series, 90.0).max(LOUDNESS_FLOOR_LUFS)
        };

        let true_peak_db = self.meter.true_peak_db(buffer)?;

        let sample_peak = buffer
            .interleaved()
            .iter()
            .fold(0.0f64, |acc, &s| acc.max((s as f64).abs()));
        let sample_peak_db = db(sample_peak);

        let mono = buffer.mono();
        let crest_factor_db = db(sample_peak / (rms(&mono) + FLOOR));

        let sr = buffer.sample_rate as usize;
        let rms_windows = windowed_rms(&mono, sr / 2, sr / 4);
        let rms_db: Vec<f64> = rms_windows.iter().map(|&v| db(v)).collect();
        let dynamic_range_db = percentile(&rms_db, 95.0) - percentile(&rms_db, 10.0);
        let noise_floor_db = percentile(&rms_db, 10.0);

        Ok(LoudnessMetrics {
            integrated_lufs: integrated,
            short_term_lufs: short_term,
            true_peak_db,
            sample_peak_db,
            crest_factor_db,
            dynamic_range_db,
            noise_floor_db,
        })
    }
}
