//! Analysis pipeline
//!
//! One analysis job is a plain synchronous pipeline over an immutable
//! decoded buffer: ingestion, the base metric extractors, mode-selected
//! detectors, optional A/B comparison, and report synthesis. Progress is
//! reported at fixed milestones through a fire-and-forget sink; any fatal
//! error propagates untouched so the caller can mark the job failed with
//! the message verbatim.

pub mod ab_compare;
pub mod advisories;
pub mod artifacts;
pub mod buffer;
pub mod capability;
pub mod genre_profiles;
pub mod ingest;
pub mod loudness;
pub mod low_end;
pub mod masking;
pub mod qa;
pub mod report;
pub mod reverb;
pub mod spectral;
pub mod stats;
pub mod stereo;
pub mod tempo_key;
pub mod transient;
pub mod vocal;

use crate::analysis::ab_compare::{compare_ab, AbComparison, MetricSummary};
use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::artifacts::ArtifactAnalyzer;
use crate::analysis::capability::Capabilities;
use crate::analysis::genre_profiles::ProfileStore;
use crate::analysis::loudness::{LoudnessAnalyzer, LoudnessMetrics};
use crate::analysis::low_end::LowEndAnalyzer;
use crate::analysis::masking::MaskingAnalyzer;
use crate::analysis::report::{build_report, MetricSet, Report};
use crate::analysis::spectral::{SpectralAnalyzer, SpectralMetrics};
use crate::analysis::stereo::{compute_stereo, StereoMetrics};
use crate::analysis::tempo_key::{BpmKeyBlock, TempoKeyAnalyzer};
use crate::analysis::transient::TransientAnalyzer;
use crate::analysis::vocal::VocalAnalyzer;
use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What kind of material the job analyzes; selects the detector subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Vocal,
    Instrumental,
    Mix,
}

impl AnalysisMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Vocal => "vocal",
            AnalysisMode::Instrumental => "instrumental",
            AnalysisMode::Mix => "mix",
        }
    }

    /// Ordered detector invocations for this mode
    fn detectors(self) -> &'static [Detector] {
        match self {
            AnalysisMode::Vocal => &[Detector::Vocal, Detector::Reverb],
            AnalysisMode::Instrumental => &[
                Detector::Masking,
                Detector::LowEnd,
                Detector::Transient,
                Detector::TempoKey,
            ],
            AnalysisMode::Mix => &[
                Detector::Vocal,
                Detector::Reverb,
                Detector::Masking,
                Detector::LowEnd,
                Detector::Transient,
                Detector::TempoKey,
            ],
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vocal" => Ok(AnalysisMode::Vocal),
            "instrumental" => Ok(AnalysisMode::Instrumental),
            "mix" => Ok(AnalysisMode::Mix),
            other => Err(format!(
                "Unknown mode '{}'; expected vocal, instrumental, or mix",
                other
            )),
        }
    }
}

/// Mode-selected detector stages, dispatched in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detector {
    Vocal,
    Reverb,
    Masking,
    LowEnd,
    Transient,
    TempoKey,
}

/// Everything the pipeline needs to analyze one upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub job_id: Uuid,
    pub mode: AnalysisMode,
    pub genre: String,
    pub vocal_style: Option<String>,
    pub audio_path: PathBuf,
    pub reference_path: Option<PathBuf>,
    pub extension: String,
}

/// Fire-and-forget progress reporting into the external job tracker
pub trait ProgressSink: Send + Sync {
    fn update(&self, job_id: Uuid, progress: f64, stage: &str);
}

/// Sink that discards all updates, for tests and one-shot runs
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _job_id: Uuid, _progress: f64, _stage: &str) {}
}

/// Run the full pipeline for one job and persist the report
///
/// Synchronous by design: the worker loop executes it on a blocking task,
/// and tests call it directly without any concurrency machinery.
pub fn run_analysis(
    request: &AnalysisRequest,
    sink: &dyn ProgressSink,
    caps: &Capabilities,
    profiles: &ProfileStore,
    advisories: &AdvisoryCatalog,
    results_dir: &Path,
) -> AnalysisResult<Report> {
    let job_id = request.job_id;
    tracing::info!(job_id = %job_id, mode = request.mode.as_str(), genre = %request.genre, "Starting analysis");

    sink.update(job_id, 0.05, "ingest");
    let audio = ingest::load(&request.audio_path, caps, advisories)?;
    let mut warnings = audio.warnings.clone();
    let duration_sec = audio.duration_sec();

    sink.update(job_id, 0.2, "metrics");
    let loudness = LoudnessAnalyzer::new(caps)?.analyze(&audio)?;
    let spectral = SpectralAnalyzer::new(caps)?.analyze(&audio)?;
    let stereo = compute_stereo(&audio);

    sink.update(job_id, 0.35, "detectors");
    let mut metrics = MetricSet {
        loudness: loudness.clone(),
        spectral: spectral.clone(),
        stereo: stereo.clone(),
        vocal: None,
        reverb: None,
        masking: None,
        low_end: None,
        transient: None,
        artifacts: ArtifactAnalyzer::new(caps)?.analyze(&audio, &request.extension, advisories)?,
        qa: qa::analyze_qa(&audio, advisories),
    };
    warnings.extend(metrics.qa.warnings.iter().cloned());
    warnings.extend(metrics.artifacts.notes.iter().cloned());

    let mut bpm_key: Option<BpmKeyBlock> = None;
    for detector in request.mode.detectors() {
        match detector {
            Detector::Vocal => {
                metrics.vocal = Some(VocalAnalyzer::new(caps)?.analyze(&audio)?);
            }
            Detector::Reverb => {
                metrics.reverb = Some(reverb::analyze_reverb(&audio, advisories));
            }
            Detector::Masking => {
                metrics.masking = Some(MaskingAnalyzer::new(caps)?.analyze(&audio, advisories)?);
            }
            Detector::LowEnd => {
                metrics.low_end = Some(LowEndAnalyzer::new(caps)?.analyze(&audio, advisories)?);
            }
            Detector::Transient => {
                metrics.transient = Some(TransientAnalyzer::new(caps)?.analyze(
                    &audio,
                    loudness.crest_factor_db,
                    advisories,
                )?);
            }
            Detector::TempoKey => {
                let analyzer = TempoKeyAnalyzer::new(caps)?;
                let tempo = analyzer.estimate_tempo(&audio, advisories)?;
                let key = analyzer.estimate_key(&audio)?;
                bpm_key = Some(BpmKeyBlock {
                    bpm: tempo.bpm,
                    confidence: tempo.confidence,
                    warning: tempo.half_double_warning,
                    key: key.key,
                    key_confidence: key.confidence,
                    note: advisories.bpm_key_note.clone(),
                });
            }
        }
    }

    sink.update(job_id, 0.6, "report");
    let ab = if request.mode == AnalysisMode::Mix {
        match &request.reference_path {
            Some(reference_path) => Some(compare_with_reference(
                reference_path,
                &loudness,
                &spectral,
                &stereo,
                caps,
                advisories,
            )?),
            None => None,
        }
    } else {
        None
    };

    sink.update(job_id, 0.8, "summarizing");
    let targets = profiles.targets(
        &request.genre,
        request.mode.as_str(),
        request.vocal_style.as_deref(),
    )?;
    let report = build_report(
        job_id,
        request.mode,
        &request.genre,
        request.vocal_style.as_deref(),
        duration_sec,
        metrics,
        warnings,
        bpm_key,
        ab,
        &targets,
        advisories,
    );

    let path = crate::storage::result_path(results_dir, job_id);
    let serialized = serde_json::to_string_pretty(&report)
        .map_err(|e| AnalysisError::Processing(format!("Failed to serialize report: {}", e)))?;
    std::fs::write(&path, serialized)?;

    tracing::info!(job_id = %job_id, path = %path.display(), "Analysis complete");
    Ok(report)
}

/// Analyze the reference track through the same loudness/spectral/stereo
/// extractors and compare against the mix
fn compare_with_reference(
    reference_path: &Path,
    mix_loudness: &LoudnessMetrics,
    mix_spectral: &SpectralMetrics,
    mix_stereo: &StereoMetrics,
    caps: &Capabilities,
    advisories: &AdvisoryCatalog,
) -> AnalysisResult<AbComparison> {
    let reference = ingest::load(reference_path, caps, advisories)?;
    let ref_loudness = LoudnessAnalyzer::new(caps)?.analyze(&reference)?;
    let ref_spectral = SpectralAnalyzer::new(caps)?.analyze(&reference)?;
    let ref_stereo = compute_stereo(&reference);

    Ok(compare_ab(
        &summarize(mix_loudness, mix_spectral, mix_stereo),
        &summarize(&ref_loudness, &ref_spectral, &ref_stereo),
        advisories,
    ))
}

fn summarize(
    loudness: &LoudnessMetrics,
    spectral: &SpectralMetrics,
    stereo: &StereoMetrics,
) -> MetricSummary {
    MetricSummary {
        integrated_lufs: loudness.integrated_lufs,
        short_term_lufs: loudness.short_term_lufs,
        true_peak_db: loudness.true_peak_db,
        crest_factor_db: loudness.crest_factor_db,
        spectral_tilt_db_per_oct: spectral.spectral_tilt_db_per_oct,
        stereo_width: stereo.width,
        stereo_correlation: stereo.correlation,
    }
}
