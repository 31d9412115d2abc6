//! Tempo and key estimation
//!
//! Tempo comes from per-window autocorrelation of the onset-strength
//! envelope: each window votes for the BPM whose lag best matches the
//! envelope's periodicity, the median vote is the point estimate, and the
//! spread of votes sets the confidence. Ambiguity advisories fire in the
//! 60-85 BPM band (possible double-time misread) and the 120-170 BPM band
//! (possible half-time misread).
//!
//! Key comes from a 12-bin chroma vector averaged over STFT frames,
//! correlated against all 12 rotations of the Krumhansl major and minor
//! profiles.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, OnsetDetector, SpectralTransform};
use crate::analysis::spectral::{STFT_HOP, STFT_WINDOW};
use crate::analysis::stats::FLOOR;
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

const MIN_BPM: f64 = 40.0;
const MAX_BPM: f64 = 240.0;

/// Envelope frames per tempo analysis window, and its hop
const TEMPO_WINDOW: usize = 512;
const TEMPO_HOP: usize = 256;

/// Krumhansl-Schmuckler key profiles, index 0 = C
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];
const KEYS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, Serialize)]
pub struct TempoEstimate {
    pub bpm: f64,
    pub confidence: f64,
    pub half_double_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyEstimate {
    pub key: String,
    pub confidence: f64,
}

/// Tempo/key block attached to the report for instrumental and mix modes
#[derive(Debug, Clone, Serialize)]
pub struct BpmKeyBlock {
    pub bpm: f64,
    pub confidence: f64,
    pub warning: Option<String>,
    pub key: String,
    pub key_confidence: f64,
    pub note: String,
}

pub struct TempoKeyAnalyzer {
    stft: Arc<dyn SpectralTransform>,
    onsets: Arc<dyn OnsetDetector>,
}

impl TempoKeyAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
            onsets: caps.onsets()?,
        })
    }

    pub fn estimate_tempo(
        &self,
        buffer: &AudioBuffer,
        advisories: &AdvisoryCatalog,
    ) -> AnalysisResult<TempoEstimate> {
        let mono = buffer.mono();
        let envelope = self.onsets.onset_envelope(&mono, buffer.sample_rate)?;
        let frame_rate = envelope.frame_rate(buffer.sample_rate) as f64;

        let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
        let mut candidates = Vec::new();

        let values = &envelope.values;
        if values.len() >= max_lag + 8 {
            let window = TEMPO_WINDOW.min(values.len());
            let mut start = 0;
            while start + window <= values.len() {
                if let Some(bpm) = window_candidate(&values[start..start + window], frame_rate) {
                    candidates.push(bpm);
                }
                start += TEMPO_HOP;
            }
            // A clip shorter than one hop past the window still gets one vote
            if candidates.is_empty() {
                if let Some(bpm) = window_candidate(values, frame_rate) {
                    candidates.push(bpm);
                }
            }
        }

        if candidates.is_empty() {
            return Ok(TempoEstimate {
                bpm: 0.0,
                confidence: 0.0,
                half_double_warning: None,
            });
        }

        let bpm = median(&candidates);
        let spread = if candidates.len() > 1 {
            std_dev(&candidates)
        } else {
            bpm * 0.1
        };
        let confidence = (1.0 - (spread / bpm.max(1.0)).min(1.0)).max(0.0);

        let half_double_warning = if (60.0..=85.0).contains(&bpm) {
            Some(advisories.double_time_warning.clone())
        } else if (120.0..=170.0).contains(&bpm) {
            Some(advisories.half_time_warning.clone())
        } else {
            None
        };

        Ok(TempoEstimate {
            bpm,
            confidence,
            half_double_warning,
        })
    }

    pub fn estimate_key(&self, buffer: &AudioBuffer) -> AnalysisResult<KeyEstimate> {
        let mono = buffer.mono();
        let spec =
            self.stft
                .magnitude_spectrogram(&mono, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;
        let avg = spec.average();

        // Fold 50 Hz - 5 kHz onto pitch classes, index 0 = C
        let mut chroma = [0.0f64; 12];
        for (f, m) in spec.freqs.iter().zip(&avg) {
            if *f < 50.0 || *f > 5000.0 {
                continue;
            }
            let midi = 69.0 + 12.0 * (*f as f64 / 440.0).log2();
            let pc = (midi.round() as i64).rem_euclid(12) as usize;
            chroma[pc] += *m as f64;
        }

        let (major_key, major_score) = best_rotation(&chroma, &MAJOR_PROFILE);
        let (minor_key, minor_score) = best_rotation(&chroma, &MINOR_PROFILE);

        if major_score >= minor_score {
            Ok(KeyEstimate {
                key: format!("{} major", major_key),
                confidence: major_score,
            })
        } else {
            Ok(KeyEstimate {
                key: format!("{} minor", minor_key),
                confidence: minor_score,
            })
        }
    }
}

/// Best BPM vote for one envelope window, or `None` for a silent window
fn window_candidate(window: &[f32], frame_rate: f64) -> Option<f64> {
    let max_lag = ((60.0 * frame_rate / MIN_BPM).ceil() as usize).min(window.len() - 1);
    let mut acf = vec![0.0f64; max_lag + 1];
    for (lag, slot) in acf.iter_mut().enumerate() {
        *slot = window[..window.len() - lag]
            .iter()
            .zip(&window[lag..])
            .map(|(a, b)| (*a as f64) * (*b as f64))
            .sum();
    }
    if acf[0] <= FLOOR {
        return None;
    }

    let mut best_bpm = None;
    let mut best_score = f64::MIN;
    for bpm_int in MIN_BPM as u32..=MAX_BPM as u32 {
        let bpm = bpm_int as f64;
        let lag = 60.0 * frame_rate / bpm;
        let lower = lag.floor() as usize;
        if lower >= 1 && lower + 1 < acf.len() {
            let frac = lag - lower as f64;
            let score = acf[lower] * (1.0 - frac) + acf[lower + 1] * frac;
            if score > best_score {
                best_score = score;
                best_bpm = Some(bpm);
            }
        }
    }
    best_bpm
}

/// Best-correlating rotation of a key profile against a chroma vector
fn best_rotation(chroma: &[f64; 12], profile: &[f64; 12]) -> (&'static str, f64) {
    let mut best_idx = 0;
    let mut best_corr = f64::MIN;
    for rotation in 0..12 {
        let rotated: Vec<f64> = (0..12)
            .map(|j| profile[(12 + j - rotation) % 12])
            .collect();
        let corr = pearson_f64(chroma, &rotated);
        if corr > best_corr {
            best_corr = corr;
            best_idx = rotation;
        }
    }
    (KEYS[best_idx], best_corr)
}

fn pearson_f64(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom < FLOOR {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
