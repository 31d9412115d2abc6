//! Transient character
//!
//! Punch from the 85th percentile of the onset-strength envelope; limiter
//! vulnerability from the crest factor (low headroom means limiter-induced
//! transient loss is more likely).

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, OnsetDetector};
use crate::analysis::stats::percentile_f32;
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct TransientReport {
    pub punch_score: f64,
    pub limiter_vulnerability: f64,
    pub note: String,
}

pub struct TransientAnalyzer {
    onsets: Arc<dyn OnsetDetector>,
}

impl TransientAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            onsets: caps.onsets()?,
        })
    }

    pub fn analyze(
        &self,
        buffer: &AudioBuffer,
        crest_factor_db: f64,
        advisories: &AdvisoryCatalog,
    ) -> AnalysisResult<TransientReport> {
        let mono = buffer.mono();
        let envelope = self.onsets.onset_envelope(&mono, buffer.sample_rate)?;

        let onset_score = percentile_f32(&envelope.values, 85.0).clamp(0.0, 1.0);
        let punch_score = (onset_score * 100.0).min(100.0);
        let limiter_vulnerability = (100.0 - crest_factor_db * 5.0).max(0.0);

        let note = if punch_score > 60.0 {
            advisories.transient_healthy.clone()
        } else {
            advisories.transient_soft.clone()
        };

        Ok(TransientReport {
            punch_score,
            limiter_vulnerability,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_stay_in_range() {
        let analyzer = TransientAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let sr = 48_000u32;
        let samples: Vec<f32> = (0..sr as usize * 2)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
            })
            .collect();
        let buf = AudioBuffer::new(samples, 1, sr);

        let report = analyzer.analyze(&buf, 12.0, &advisories).unwrap();
        assert!((0.0..=100.0).contains(&report.punch_score));
        assert!((0.0..=100.0).contains(&report.limiter_vulnerability));
    }

    #[test]
    fn high_crest_factor_means_low_vulnerability() {
        let analyzer = TransientAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let buf = AudioBuffer::new(vec![0.0f32; 48_000], 1, 48_000);

        let crushed = analyzer.analyze(&buf, 4.0, &advisories).unwrap();
        let dynamic = analyzer.analyze(&buf, 20.0, &advisories).unwrap();
        assert!(crushed.limiter_vulnerability > dynamic.limiter_vulnerability);
        assert_eq!(dynamic.limiter_vulnerability, 0.0);
    }

    #[test]
    fn missing_onset_detector_fails_construction() {
        let caps = Capabilities::empty();
        assert!(TransientAnalyzer::new(&caps).is_err());
    }
}
