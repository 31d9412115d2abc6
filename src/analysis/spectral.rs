//! Spectral balance metrics
//!
//! Time-averaged magnitude spectrum (4096-sample Hann window, 50% overlap)
//! aggregated into seven named bands, plus tilt, centroid, and rolloff.

use crate::analysis::buffer::AudioBuffer;
use crate::analysis::capability::{Capabilities, SpectralTransform};
use crate::analysis::stats::{band_energy, db, FLOOR};
use crate::error::AnalysisResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const STFT_WINDOW: usize = 4096;
pub const STFT_HOP: usize = 2048;

/// Named bands, low to high
const BANDS: [(&str, f32, f32); 7] = [
    ("sub", 20.0, 60.0),
    ("low", 60.0, 150.0),
    ("low_mid", 150.0, 400.0),
    ("mid", 400.0, 2000.0),
    ("high_mid", 2000.0, 6000.0),
    ("high", 6000.0, 16000.0),
    ("air", 16000.0, 20000.0),
];

#[derive(Debug, Clone, Serialize)]
pub struct SpectralMetrics {
    pub band_energies_db: BTreeMap<String, f64>,
    pub spectral_tilt_db_per_oct: f64,
    pub centroid_hz: f64,
    pub rolloff_hz: f64,
}

pub struct SpectralAnalyzer {
    stft: Arc<dyn SpectralTransform>,
}

impl SpectralAnalyzer {
    pub fn new(caps: &Capabilities) -> AnalysisResult<Self> {
        Ok(Self {
            stft: caps.spectral()?,
        })
    }

    pub fn analyze(&self, buffer: &AudioBuffer) -> AnalysisResult<SpectralMetrics> {
        let mono = buffer.mono();
        let spec =
            self.stft
                .magnitude_spectrogram(&mono, buffer.sample_rate, STFT_WINDOW, STFT_HOP)?;
        let avg = spec.average();

        let mut band_energies_db = BTreeMap::new();
        for (name, low, high) in BANDS {
            let energy = band_energy(&avg, &spec.freqs, low, high);
            band_energies_db.insert(name.to_string(), db(energy));
        }

        // Restrict tilt/centroid/rolloff to the audible 20 Hz - 20 kHz range
        let mut log_f = Vec::new();
        let mut log_m = Vec::new();
        let mut freqs_valid = Vec::new();
        let mut mag_valid = Vec::new();
        for (f, m) in spec.freqs.iter().zip(&avg) {
            if *f > 20.0 && *f < 20_000.0 {
                log_f.push(((*f as f64) + FLOOR).log2());
                log_m.push(((*m as f64) + FLOOR).log10());
                freqs_valid.push(*f as f64);
                mag_valid.push(*m as f64);
            }
        }

        // Tilt: least-squares slope of log2(f) vs log10(mag), scaled to
        // approximate dB per octave
        let spectral_tilt_db_per_oct = if log_f.len() > 1 {
            linear_slope(&log_f, &log_m) * 20.0
        } else {
            0.0
        };

        let mag_sum: f64 = mag_valid.iter().sum::<f64>() + FLOOR;
        let centroid_hz = freqs_valid
            .iter()
            .zip(&mag_valid)
            .map(|(f, m)| f * m)
            .sum::<f64>()
            / mag_sum;

        // Rolloff: first frequency where cumulative energy crosses 85%
        let threshold = 0.85 * mag_valid.iter().sum::<f64>();
        let mut cumulative = 0.0f64;
        let mut rolloff_hz = freqs_valid.last().copied().unwrap_or(0.0);
        for (f, m) in freqs_valid.iter().zip(&mag_valid) {
            cumulative += m;
            if cumulative >= threshold {
                rolloff_hz = *f;
                break;
            }
        }

        Ok(SpectralMetrics {
            band_energies_db,
            spectral_tilt_db_per_oct,
            centroid_hz,
            rolloff_hz,
        })
    }
}

/// Least-squares slope of y over x
fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        num += (xi - mean_x) * (yi - mean_y);
        den += (xi - mean_x) * (xi - mean_x);
    }
    if den < FLOOR {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(freq: f32, secs: f32) -> AudioBuffer {
        let sr = 48_000u32;
        let n = (secs * sr as f32) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.1 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect();
        AudioBuffer::new(samples, 1, sr)
    }

    #[test]
    fn centroid_tracks_a_pure_tone() {
        let analyzer = SpectralAnalyzer::new(&Capabilities::default()).unwrap();
        let metrics = analyzer.analyze(&sine_buffer(440.0, 1.0)).unwrap();
        assert!(metrics.centroid_hz > 0.0);
        assert!(metrics.rolloff_hz > 0.0);
        assert_eq!(metrics.band_energies_db.len(), 7);
        assert!(metrics.spectral_tilt_db_per_oct.is_finite());
    }

    #[test]
    fn all_bands_finite_on_silence() {
        let analyzer = SpectralAnalyzer::new(&Capabilities::default()).unwrap();
        let silence = AudioBuffer::new(vec![0.0f32; 48_000], 1, 48_000);
        let metrics = analyzer.analyze(&silence).unwrap();
        assert!(metrics.band_energies_db.values().all(|v| v.is_finite()));
        assert!(metrics.centroid_hz.is_finite());
        assert!(metrics.rolloff_hz.is_finite());
        assert!(metrics.spectral_tilt_db_per_oct.is_finite());
    }

    #[test]
    fn higher_tone_has_higher_centroid() {
        let analyzer = SpectralAnalyzer::new(&Capabilities::default()).unwrap();
        let low = analyzer.analyze(&sine_buffer(220.0, 1.0)).unwrap();
        let high = analyzer.analyze(&sine_buffer(4000.0, 1.0)).unwrap();
        assert!(high.centroid_hz > low.centroid_hz);
    }
}
