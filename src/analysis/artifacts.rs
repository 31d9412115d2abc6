//! Processing artifact detection
//!
//! Four fixed-threshold heuristics: gating (a noise gate chopping quiet
//! passages), crackle (dense sign-change discontinuities), warble
//! (noise-reduction chirp showing up as erratic spectral flux), and lossy
//! codec suspicion from the source extension.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, SpectralTransform};
use crate::analysis::stats::percentile;
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

/// Extensions that mark the source as lossy-coded
const LOSSY_EXTENSIONS: [&str; 3] = [".mp3", ".aac", ".m4a"];

const WARBLE_WINDOW: usize = 2048;
const WARBLE_HOP: usize = 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub gating: bool,
    pub warble: bool,
    pub crackle: bool,
    pub codec: Option<String>,
    pub notes: Vec<String>,
}

pub struct ArtifactAnalyzer {
    stft: Arc<dyn SpectralTransform>,
}

impl ArtifactAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
        })
    }

    pub fn analyze(
        &self,
        buffer: &AudioBuffer,
        extension: &str,
        advisories: &AdvisoryCatalog,
    ) -> AnalysisResult<ArtifactReport> {
        let mono = buffer.mono();
        let sr = buffer.sample_rate as usize;

        // Gating: the quietest passages sit far below the median level
        let rms_vals = crate::analysis::stats::windowed_rms(&mono, sr / 20, sr / 40);
        let gating = percentile(&rms_vals, 5.0) < percentile(&rms_vals, 60.0) * 0.15;

        // Crackle: mean absolute sign-change rate of the raw waveform
        let sign_flips: f64 = mono
            .windows(2)
            .map(|w| (signum(w[1]) - signum(w[0])).abs())
            .sum();
        let crackle = if mono.len() > 1 {
            sign_flips / (mono.len() - 1) as f64 > 1.5
        } else {
            false
        };

        // Warble: frame-to-frame spectral flux with variance far above its mean
        let spec =
            self.stft
                .magnitude_spectrogram(&mono, buffer.sample_rate, WARBLE_WINDOW, WARBLE_HOP)?;
        let flux: Vec<f64> = spec
            .frames
            .windows(2)
            .map(|pair| {
                pair[1]
                    .iter()
                    .zip(&pair[0])
                    .map(|(b, a)| {
                        let d = (*b - *a) as f64;
                        d * d
                    })
                    .sum::<f64>()
                    / pair[0].len().max(1) as f64
            })
            .collect();
        let warble = if flux.len() > 1 {
            let mean = flux.iter().sum::<f64>() / flux.len() as f64;
            let var = flux.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / flux.len() as f64;
            var.sqrt() > mean * 2.0
        } else {
            false
        };

        let ext = extension.to_ascii_lowercase();
        let codec = LOSSY_EXTENSIONS
            .iter()
            .find(|&&e| e == ext)
            .map(|_| ext.clone());

        let mut notes = Vec::new();
        if gating {
            notes.push(advisories.gating_note.clone());
        }
        if warble {
            notes.push(advisories.warble_note.clone());
        }
        if crackle {
            notes.push(advisories.crackle_note.clone());
        }
        if codec.is_some() {
            notes.push(advisories.codec_note.clone());
        }

        Ok(ArtifactReport {
            gating,
            warble,
            crackle,
            codec,
            notes,
        })
    }
}

fn signum(v: f32) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ArtifactAnalyzer {
        ArtifactAnalyzer::new(&Capabilities::default()).unwrap()
    }

    fn sine_buffer(freq: f32, secs: f32) -> AudioBuffer {
        let sr = 48_000u32;
        let samples: Vec<f32> = (0..(secs * sr as f32) as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.3 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect();
        AudioBuffer::new(samples, 1, sr)
    }

    #[test]
    fn clean_tone_has_no_artifacts() {
        let advisories = AdvisoryCatalog::default();
        let report = analyzer()
            .analyze(&sine_buffer(440.0, 2.0), ".wav", &advisories)
            .unwrap();
        assert!(!report.gating);
        assert!(!report.crackle);
        assert!(report.codec.is_none());
        assert!(report.notes.is_empty());
    }

    #[test]
    fn lossy_extension_is_flagged() {
        let advisories = AdvisoryCatalog::default();
        let report = analyzer()
            .analyze(&sine_buffer(440.0, 1.0), ".MP3", &advisories)
            .unwrap();
        assert_eq!(report.codec.as_deref(), Some(".mp3"));
        assert!(report.notes.contains(&advisories.codec_note));
    }

    #[test]
    fn gated_signal_is_detected() {
        let advisories = AdvisoryCatalog::default();
        let sr = 48_000usize;
        // 0.5 s of tone alternating with 0.5 s of hard silence
        let mut samples = Vec::with_capacity(sr * 4);
        for block in 0..8 {
            for i in 0..sr / 2 {
                let t = i as f32 / sr as f32;
                let v = if block % 2 == 0 {
                    0.4 * (2.0 * std::f32::consts::PI * 300.0 * t).sin()
                } else {
                    0.0
                };
                samples.push(v);
            }
        }
        let buf = AudioBuffer::new(samples, 1, sr as u32);
        let report = analyzer().analyze(&buf, ".wav", &advisories).unwrap();
        assert!(report.gating);
        assert!(report.notes.contains(&advisories.gating_note));
    }

    #[test]
    fn alternating_sign_noise_reads_as_crackle() {
        let advisories = AdvisoryCatalog::default();
        let samples: Vec<f32> = (0..48_000)
            .map(|i| if i % 2 == 0 { 0.2 } else { -0.2 })
            .collect();
        let buf = AudioBuffer::new(samples, 1, 48_000);
        let report = analyzer().analyze(&buf, ".wav", &advisories).unwrap();
        assert!(report.crackle);
    }
}
