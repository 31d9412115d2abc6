//! Frequency masking conflicts
//!
//! Ranks six musically meaningful bands by their share of total spectral
//! energy and reports the top three as likely conflict zones. Band labels,
//! source descriptions, and the advisory note come from the catalog.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, SpectralTransform};
use crate::analysis::spectral::{STFT_HOP, STFT_WINDOW};
use crate::analysis::stats::{band_energy, FLOOR};
use crate::error::AnalysisResult;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct MaskingConflict {
    pub band_hz: String,
    pub likely_sources: String,
    pub note: String,
}

pub struct MaskingAnalyzer {
    stft: Arc<dyn SpectralTransform>,
}

impl MaskingAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
        })
    }

    pub fn analyze(
        &self,
        buffer: &AudioBuffer,
        advisories: &AdvisoryCatalog,
    ) -> AnalysisResult<Vec<MaskingConflict>> {
        let mono = buffer.mono();
        let spec =
            self.stft
                .magnitude_spectrogram(&mono, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;
        let avg = spec.average();

        let total = avg.iter().map(|&m| m as f64).sum::<f64>() / avg.len().max(1) as f64;

        let mut scored: Vec<(f64, &crate::analysis::advisories::MaskingBandText)> = advisories
            .masking_bands
            .iter()
            .map(|band| {
                let energy = band_energy(&avg, &spec.freqs, band.low_hz, band.high_hz);
                (energy / (total + FLOOR), band)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(3)
            .map(|(_, band)| MaskingConflict {
                band_hz: band.label.clone(),
                likely_sources: band.sources.clone(),
                note: advisories.masking_note.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_exactly_three_conflicts() {
        let analyzer = MaskingAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let sr = 48_000u32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.1 * (2.0 * std::f32::consts::PI * 100.0 * t).sin()
                    + 0.05 * (2.0 * std::f32::consts::PI * 1500.0 * t).sin()
            })
            .collect();
        let buf = AudioBuffer::new(samples, 1, sr);

        let conflicts = analyzer.analyze(&buf, &advisories).unwrap();
        assert_eq!(conflicts.len(), 3);
        assert!(conflicts.iter().all(|c| !c.band_hz.is_empty()));
    }

    #[test]
    fn bass_tone_ranks_bass_band_first() {
        let analyzer = MaskingAnalyzer::new(&Capabilities::default()).unwrap();
        let advisories = AdvisoryCatalog::default();
        let sr = 48_000u32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.2 * (2.0 * std::f32::consts::PI * 90.0 * t).sin()
            })
            .collect();
        let buf = AudioBuffer::new(samples, 1, sr);

        let conflicts = analyzer.analyze(&buf, &advisories).unwrap();
        assert_eq!(conflicts[0].band_hz, "60-120 Hz");
    }
}
