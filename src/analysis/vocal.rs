//! Vocal take diagnostics
//!
//! Sibilance, plosive, resonance, and roominess heuristics over the averaged
//! spectrum. Severities are ratios normalized by fixed references and
//! clamped to [0, 1] so the display range stays stable on extreme input.

use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, SpectralTransform};
use crate::analysis::spectral::{STFT_HOP, STFT_WINDOW};
use crate::analysis::stats::{band_energy, percentile_f32, FLOOR};
use crate::error::AnalysisResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reference ratios that map a "typical problem" onto severity 1.0
const SIBILANCE_REFERENCE: f64 = 0.7;
const PLOSIVE_REFERENCE: f64 = 1.2;
const ROOMINESS_REFERENCE: f64 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct VocalFindings {
    pub sibilance_severity: f64,
    pub plosive_severity: f64,
    pub resonance_bands_hz: Vec<u32>,
    pub roominess_score: f64,
    /// Raw sub-band energies for diagnostic display
    pub sibilance_bands: BTreeMap<String, f64>,
}

pub struct VocalAnalyzer {
    stft: Arc<dyn SpectralTransform>,
}

impl VocalAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
        })
    }

    pub fn analyze(&self, buffer: &AudioBuffer) -> AnalysisResult<VocalFindings> {
        let mono = buffer.mono();
        let spec =
            self.stft
                .magnitude_spectrogram(&mono, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;
        let avg = spec.average();

        let sibilance = band_energy(&avg, &spec.freqs, 5000.0, 10_000.0);
        let presence = band_energy(&avg, &spec.freqs, 2000.0, 5000.0) + FLOOR;
        let sibilance_severity = (sibilance / presence / SIBILANCE_REFERENCE).min(1.0);

        let low_band = band_energy(&avg, &spec.freqs, 20.0, 150.0);
        let mid_band = band_energy(&avg, &spec.freqs, 150.0, 400.0) + FLOOR;
        let plosive_severity = (low_band / mid_band / PLOSIVE_REFERENCE).min(1.0);

        // Up to five spectral peaks above the 85th percentile, 200 Hz - 6 kHz
        let height = percentile_f32(&avg, 85.0) as f32;
        let mut resonance_bands_hz = Vec::new();
        for i in 1..avg.len().saturating_sub(1) {
            if avg[i] > height && avg[i] > avg[i - 1] && avg[i] >= avg[i + 1] {
                let freq = spec.freqs[i];
                if (200.0..=6000.0).contains(&freq) {
                    resonance_bands_hz.push(freq as u32);
                    if resonance_bands_hz.len() == 5 {
                        break;
                    }
                }
            }
        }

        let roominess = band_energy(&avg, &spec.freqs, 200.0, 600.0)
            / (band_energy(&avg, &spec.freqs, 2000.0, 6000.0) + FLOOR);
        let roominess_score = (roominess / ROOMINESS_REFERENCE).min(1.0);

        let mut sibilance_bands = BTreeMap::new();
        sibilance_bands.insert(
            "5-7k".to_string(),
            band_energy(&avg, &spec.freqs, 5000.0, 7000.0),
        );
        sibilance_bands.insert(
            "7-10k".to_string(),
            band_energy(&avg, &spec.freqs, 7000.0, 10_000.0),
        );
        sibilance_bands.insert(
            "10-12k".to_string(),
            band_energy(&avg, &spec.freqs, 10_000.0, 12_000.0),
        );

        Ok(VocalFindings {
            sibilance_severity,
            plosive_severity,
            resonance_bands_hz,
            roominess_score,
            sibilance_bands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_buffer(freq: f32) -> AudioBuffer {
        let sr = 48_000u32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.1 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect();
        AudioBuffer::new(samples, 1, sr)
    }

    #[test]
    fn severities_are_bounded() {
        let analyzer = VocalAnalyzer::new(&Capabilities::default()).unwrap();
        for freq in [100.0, 440.0, 6000.0] {
            let findings = analyzer.analyze(&tone_buffer(freq)).unwrap();
            assert!((0.0..=1.0).contains(&findings.sibilance_severity));
            assert!((0.0..=1.0).contains(&findings.plosive_severity));
            assert!((0.0..=1.0).contains(&findings.roominess_score));
            assert!(findings.resonance_bands_hz.len() <= 5);
        }
    }

    #[test]
    fn high_band_tone_reads_as_sibilant() {
        let analyzer = VocalAnalyzer::new(&Capabilities::default()).unwrap();
        let findings = analyzer.analyze(&tone_buffer(7000.0)).unwrap();
        assert!(findings.sibilance_severity > 0.9);
    }

    #[test]
    fn midrange_tone_registers_a_resonance() {
        let analyzer = VocalAnalyzer::new(&Capabilities::default()).unwrap();
        let findings = analyzer.analyze(&tone_buffer(1000.0)).unwrap();
        assert!(!findings.resonance_bands_hz.is_empty());
        let peak = findings.resonance_bands_hz[0];
        assert!((900..=1100).contains(&peak), "peak at {} Hz", peak);
    }

    #[test]
    fn silence_produces_finite_findings() {
        let analyzer = VocalAnalyzer::new(&Capabilities::default()).unwrap();
        let silence = AudioBuffer::new(vec![0.0f32; 48_000], 1, 48_000);
        let findings = analyzer.analyze(&silence).unwrap();
        assert!(findings.sibilance_severity.is_finite());
        assert!(findings.plosive_severity.is_finite());
        assert!(findings.roominess_score.is_finite());
        assert!(findings.sibilance_bands.values().all(|v| v.is_finite()));
    }
}
