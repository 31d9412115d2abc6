//! Report synthesis
//!
//! Folds every metric record and the genre targets into per-dimension
//! scores, categorized recommendations, and an executive summary. Range
//! scores are 100 inside the target and lose 5 points per unit outside;
//! the noise dimension is penalized directly by the noise floor level
//! (a quiet floor is never "too good").

use crate::analysis::ab_compare::AbComparison;
use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::artifacts::ArtifactReport;
use crate::analysis::genre_profiles::Targets;
use crate::analysis::loudness::LoudnessMetrics;
use crate::analysis::low_end::LowEndReport;
use crate::analysis::masking::MaskingConflict;
use crate::analysis::qa::QaReport;
use crate::analysis::reverb::ReverbReport;
use crate::analysis::spectral::SpectralMetrics;
use crate::analysis::stereo::StereoMetrics;
use crate::analysis::tempo_key::BpmKeyBlock;
use crate::analysis::transient::TransientReport;
use crate::analysis::vocal::VocalFindings;
use crate::analysis::AnalysisMode;
use serde::Serialize;
use uuid::Uuid;

/// Severity above which a vocal finding earns a recording recommendation
const SEVERITY_THRESHOLD: f64 = 0.6;
/// Score below which the executive summary switches to the uneven framing
const UNEVEN_THRESHOLD: f64 = 60.0;

/// All metric records for one analysis run, keyed by extractor name in the
/// serialized report. Mode-dependent extractors are optional.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSet {
    pub loudness: LoudnessMetrics,
    pub spectral: SpectralMetrics,
    pub stereo: StereoMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal: Option<VocalFindings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverb: Option<ReverbReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masking: Option<Vec<MaskingConflict>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_end: Option<LowEndReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient: Option<TransientReport>,
    pub artifacts: ArtifactReport,
    pub qa: QaReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scores {
    pub loudness: f64,
    pub spectral_balance: f64,
    pub stereo: f64,
    pub dynamics: f64,
    pub noise: f64,
}

impl Scores {
    pub fn min(&self) -> f64 {
        self.loudness
            .min(self.spectral_balance)
            .min(self.stereo)
            .min(self.dynamics)
            .min(self.noise)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub recording: Vec<String>,
    pub mixing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Appendix {
    pub notes: String,
}

/// The terminal aggregate, persisted as the job's permanent result
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub job_id: Uuid,
    pub mode: AnalysisMode,
    pub genre: String,
    pub vocal_style: Option<String>,
    pub duration_sec: f64,
    pub summary: String,
    pub scores: Scores,
    pub recommendations: Recommendations,
    pub metrics: MetricSet,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_key: Option<BpmKeyBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ab_compare: Option<AbComparison>,
    pub appendix: Appendix,
}

/// 100 inside the target range, minus 5 per unit of distance outside,
/// floored at 0. Same slope for undershoot and overshoot.
pub fn score_range(value: f64, target: [f64; 2]) -> f64 {
    let [min, max] = target;
    if (min..=max).contains(&value) {
        return 100.0;
    }
    let distance = if value < min { min - value } else { value - max };
    (100.0 - distance * 5.0).max(0.0)
}

#[allow(clippy::too_many_arguments)]
pub fn build_report(
    job_id: Uuid,
    mode: AnalysisMode,
    genre: &str,
    vocal_style: Option<&str>,
    duration_sec: f64,
    metrics: MetricSet,
    warnings: Vec<String>,
    bpm_key: Option<BpmKeyBlock>,
    ab_compare: Option<AbComparison>,
    targets: &Targets,
    advisories: &AdvisoryCatalog,
) -> Report {
    let loudness = &metrics.loudness;
    let spectral = &metrics.spectral;
    let stereo = &metrics.stereo;

    let scores = Scores {
        loudness: score_range(loudness.integrated_lufs, targets.lufs_target),
        spectral_balance: score_range(spectral.spectral_tilt_db_per_oct, targets.spectral_tilt),
        stereo: score_range(stereo.width, targets.stereo_width),
        dynamics: score_range(loudness.crest_factor_db, targets.crest_factor),
        noise: (100.0 - loudness.noise_floor_db.abs()).max(0.0),
    };

    let mut recording = Vec::new();
    let mut mixing = Vec::new();

    if loudness.true_peak_db > -1.0 {
        mixing.push(advisories.rec_true_peak.clone());
    }
    if loudness.integrated_lufs < targets.lufs_target[0] {
        mixing.push(advisories.rec_loudness_low.clone());
    } else if loudness.integrated_lufs > targets.lufs_target[1] {
        mixing.push(advisories.rec_loudness_high.clone());
    }
    if spectral.spectral_tilt_db_per_oct < targets.spectral_tilt[0] {
        mixing.push(advisories.rec_tilt_dark.clone());
    } else if spectral.spectral_tilt_db_per_oct > targets.spectral_tilt[1] {
        mixing.push(advisories.rec_tilt_bright.clone());
    }
    if stereo.correlation < 0.0 {
        mixing.push(advisories.rec_correlation.clone());
    }

    if let Some(vocal) = &metrics.vocal {
        if vocal.sibilance_severity > SEVERITY_THRESHOLD {
            recording.push(advisories.rec_deesser.clone());
        }
        if vocal.plosive_severity > SEVERITY_THRESHOLD {
            recording.push(advisories.rec_pop_filter.clone());
        }
        if vocal.roominess_score > SEVERITY_THRESHOLD {
            recording.push(advisories.rec_room_treatment.clone());
        }
    }
    recording.extend(metrics.artifacts.notes.iter().cloned());

    // Neither list is ever empty
    if recording.is_empty() {
        recording.push(advisories.rec_recording_ok.clone());
    }
    if mixing.is_empty() {
        mixing.push(advisories.rec_mixing_ok.clone());
    }

    let summary = if scores.min() < UNEVEN_THRESHOLD {
        advisories.summary_uneven.clone()
    } else {
        advisories.summary_on_target.clone()
    };

    Report {
        job_id,
        mode,
        genre: genre.to_string(),
        vocal_style: vocal_style.map(str::to_string),
        duration_sec,
        summary,
        scores,
        recommendations: Recommendations { recording, mixing },
        metrics,
        warnings,
        bpm_key,
        ab_compare,
        appendix: Appendix {
            notes: advisories.appendix_note.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::genre_profiles::TargetOverlay;
    use std::collections::BTreeMap;

    fn targets() -> Targets {
        Targets::from(&TargetOverlay::default())
    }

    fn metric_set(on_target: bool) -> MetricSet {
        let (lufs, tilt, width, crest) = if on_target {
            (-14.0, -1.0, 0.3, 10.0)
        } else {
            (-30.0, 2.5, 1.6, 2.0)
        };
        MetricSet {
            loudness: LoudnessMetrics {
                integrated_lufs: lufs,
                short_term_lufs: lufs + 1.0,
                true_peak_db: -2.0,
                sample_peak_db: -2.5,
                crest_factor_db: crest,
                dynamic_range_db: 8.0,
                noise_floor_db: -55.0,
            },
            spectral: SpectralMetrics {
                band_energies_db: BTreeMap::new(),
                spectral_tilt_db_per_oct: tilt,
                centroid_hz: 1200.0,
                rolloff_hz: 8000.0,
            },
            stereo: StereoMetrics {
                width,
                correlation: 0.9,
                mono_compatibility: 1.0,
            },
            vocal: None,
            reverb: None,
            masking: None,
            low_end: None,
            transient: None,
            artifacts: ArtifactReport {
                gating: false,
                warble: false,
                crackle: false,
                codec: None,
                notes: Vec::new(),
            },
            qa: QaReport {
                dc_offset_db: -90.0,
                channel_imbalance_db: 0.0,
                warnings: Vec::new(),
            },
        }
    }

    #[test]
    fn boundary_value_scores_100_and_ten_outside_scores_50() {
        assert_eq!(score_range(-12.0, [-16.0, -12.0]), 100.0);
        assert_eq!(score_range(-16.0, [-16.0, -12.0]), 100.0);
        assert_eq!(score_range(-2.0, [-16.0, -12.0]), 50.0);
        assert_eq!(score_range(-26.0, [-16.0, -12.0]), 50.0);
        assert_eq!(score_range(-50.0, [-16.0, -12.0]), 0.0);
    }

    #[test]
    fn on_target_metrics_read_as_on_target() {
        let advisories = AdvisoryCatalog::default();
        let report = build_report(
            Uuid::new_v4(),
            AnalysisMode::Mix,
            "pop",
            None,
            30.0,
            metric_set(true),
            Vec::new(),
            None,
            None,
            &targets(),
            &advisories,
        );

        assert_eq!(report.scores.loudness, 100.0);
        assert_eq!(report.summary, advisories.summary_on_target);
        assert_eq!(report.recommendations.mixing, vec![advisories.rec_mixing_ok]);
        assert_eq!(
            report.recommendations.recording,
            vec![advisories.rec_recording_ok]
        );
    }

    #[test]
    fn off_target_metrics_switch_to_the_uneven_framing() {
        let advisories = AdvisoryCatalog::default();
        let report = build_report(
            Uuid::new_v4(),
            AnalysisMode::Mix,
            "pop",
            None,
            30.0,
            metric_set(false),
            Vec::new(),
            None,
            None,
            &targets(),
            &advisories,
        );

        assert_eq!(report.summary, advisories.summary_uneven);
        assert!(report.recommendations.mixing.contains(&advisories.rec_loudness_low));
        assert!(report.scores.min() < 60.0);
    }

    #[test]
    fn severe_vocal_findings_drive_recording_recommendations() {
        let advisories = AdvisoryCatalog::default();
        let mut metrics = metric_set(true);
        metrics.vocal = Some(VocalFindings {
            sibilance_severity: 0.9,
            plosive_severity: 0.2,
            resonance_bands_hz: Vec::new(),
            roominess_score: 0.8,
            sibilance_bands: BTreeMap::new(),
        });
        let report = build_report(
            Uuid::new_v4(),
            AnalysisMode::Vocal,
            "pop",
            Some("soft"),
            12.0,
            metrics,
            Vec::new(),
            None,
            None,
            &targets(),
            &advisories,
        );

        assert!(report.recommendations.recording.contains(&advisories.rec_deesser));
        assert!(report
            .recommendations
            .recording
            .contains(&advisories.rec_room_treatment));
        assert!(!report.recommendations.recording.contains(&advisories.rec_pop_filter));
    }

    #[test]
    fn scores_are_always_bounded() {
        let advisories = AdvisoryCatalog::default();
        let mut metrics = metric_set(false);
        metrics.loudness.noise_floor_db = -200.0;
        let report = build_report(
            Uuid::new_v4(),
            AnalysisMode::Instrumental,
            "unknown",
            None,
            5.0,
            metrics,
            Vec::new(),
            None,
            None,
            &targets(),
            &advisories,
        );

        for score in [
            report.scores.loudness,
            report.scores.spectral_balance,
            report.scores.stereo,
            report.scores.dynamics,
            report.scores.noise,
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }
}
