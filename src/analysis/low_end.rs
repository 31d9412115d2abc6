//! Low-end stereo placement
//!
//! Bass below ~120 Hz should generally stay mono for playback-system
//! safety; this measures the side-to-mid energy ratio restricted to
//! 20-120 Hz and flags a "wide sub".

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, SpectralTransform};
use crate::analysis::spectral::{STFT_HOP, STFT_WINDOW};
use crate::analysis::stats::{band_energy, FLOOR};
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

const WIDE_SUB_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Serialize)]
pub struct LowEndReport {
    pub low_end_score: f64,
    pub wide_sub_flag: bool,
    pub side_energy_ratio: f64,
    pub note: String,
}

pub struct LowEndAnalyzer {
    stft: Arc<dyn SpectralTransform>,
}

impl LowEndAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
        })
    }

    pub fn analyze(
        &self,
        buffer: &AudioBuffer,
        advisories: &AdvisoryCatalog,
    ) -> AnalysisResult<LowEndReport> {
        // Mono input has no side channel; treat side as silent
        let (mid, side) = buffer
            .mid_side()
            .unwrap_or_else(|| (buffer.mono(), vec![0.0; buffer.frames()]));

        let spec_mid =
            self.stft
                .magnitude_spectrogram(&mid, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;
        let spec_side =
            self.stft
                .magnitude_spectrogram(&side, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;

        let mid_energy = band_energy(&spec_mid.average(), &spec_mid.freqs, 20.0, 120.0);
        let side_energy = band_energy(&spec_side.average(), &spec_side.freqs, 20.0, 120.0);
        let ratio = side_energy / (mid_energy + FLOOR);

        let low_end_score = (100.0 - ratio * 120.0).max(0.0);
        let wide_sub_flag = ratio > WIDE_SUB_THRESHOLD;
        let note = if wide_sub_flag {
            advisories.wide_sub_note.clone()
        } else {
            advisories.sub_centered_note.clone()
        };

        Ok(LowEndReport {
            low_end_score,
            wide_sub_flag,
            side_energy_ratio: ratio,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from_channels(left: Vec<f32>, right: Vec<f32>) -> AudioBuffer {
        let mut interleaved = Vec::with_capacity(left.len() * 2);
        for (l, r) in left.iter().zip(&right) {
            interleaved.push(*l);
            interleaved.push(*r);
        }
        AudioBuffer::new(interleaved, 2, 48_000)
    }

    fn sine(freq: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                amp * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn centered_bass_scores_high() {
        let analyzer = LowEndAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let bass = sine(60.0, 48_000, 0.3);
        let report = analyzer
            .analyze(&buffer_from_channels(bass.clone(), bass), &advisories)
            .unwrap();
        assert!(!report.wide_sub_flag);
        assert!(report.low_end_score > 90.0);
        assert!(report.side_energy_ratio < 0.05);
    }

    #[test]
    fn out_of_phase_bass_flags_wide_sub() {
        let analyzer = LowEndAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let bass = sine(60.0, 48_000, 0.3);
        let inverted: Vec<f32> = bass.iter().map(|v| -v).collect();
        let report = analyzer
            .analyze(&buffer_from_channels(bass, inverted), &advisories)
            .unwrap();
        assert!(report.wide_sub_flag);
        assert_eq!(report.low_end_score, 0.0);
        assert_eq!(report.note, advisories.wide_sub_note);
    }

    #[test]
    fn mono_input_is_always_centered() {
        let analyzer = LowEndAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let buf = AudioBuffer::new(sine(60.0, 48_000, 0.3), 1, 48_000);
        let report = analyzer.analyze(&buf, &advisories).unwrap();
        assert!(!report.wide_sub_flag);
        assert!(report.low_end_score > 99.0);
    }
}
