//! Technical QA checks
//!
//! DC offset and channel balance in dB, plus advisory warnings for offsets
//! louder than -40 dB, imbalance beyond 1.5 dB, and non-standard source
//! sample rates. All observations are warnings, never errors.

use crate::analysis::advisories::AdvisoryCatalog;
use crate::analysis::buffer::AudioBuffer;
use crate::analysis::stats::{db, rms, FLOOR};
use serde::Serialize;

const STANDARD_RATES: [u32; 3] = [44_100, 48_000, 96_000];

#[derive(Debug, Clone, Serialize)]
pub struct QaReport {
    pub dc_offset_db: f64,
    pub channel_imbalance_db: f64,
    pub warnings: Vec<String>,
}

pub fn analyze_qa(buffer: &AudioBuffer, advisories: &AdvisoryCatalog) -> QaReport {
    let mono = buffer.mono();
    let dc_offset = if mono.is_empty() {
        0.0
    } else {
        mono.iter().map(|&s| s as f64).sum::<f64>() / mono.len() as f64
    };
    let dc_offset_db = db(dc_offset.abs());

    let channel_imbalance_db = if buffer.channels() > 1 {
        let rms_left = rms(&buffer.channel(0)) + FLOOR;
        let rms_right = rms(&buffer.channel(1)) + FLOOR;
        20.0 * (rms_left / rms_right).log10()
    } else {
        0.0
    };

    let mut warnings = Vec::new();
    if dc_offset_db > -40.0 {
        warnings.push(advisories.dc_offset_warning.clone());
    }
    if channel_imbalance_db.abs() > 1.5 {
        warnings.push(advisories.imbalance_warning.clone());
    }
    // Evaluated against the source rate; the analysis buffer is always 48 kHz
    if !STANDARD_RATES.contains(&buffer.source_sample_rate) {
        warnings.push(advisories.sample_rate_warning.clone());
    }

    QaReport {
        dc_offset_db,
        channel_imbalance_db,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                amp * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn clean_stereo_has_no_warnings() {
        let advisories = AdvisoryCatalog::default();
        let tone = sine(440.0, 48_000, 0.3);
        let mut interleaved = Vec::new();
        for s in &tone {
            interleaved.push(*s);
            interleaved.push(*s);
        }
        let buf = AudioBuffer::new(interleaved, 2, 48_000);
        let report = analyze_qa(&buf, &advisories);

        assert!(report.dc_offset_db < -40.0);
        assert!(report.channel_imbalance_db.abs() < 0.01);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn dc_offset_triggers_a_warning() {
        let advisories = AdvisoryCatalog::default();
        let samples: Vec<f32> = sine(440.0, 48_000, 0.3).iter().map(|s| s + 0.1).collect();
        let buf = AudioBuffer::new(samples, 1, 48_000);
        let report = analyze_qa(&buf, &advisories);

        assert!(report.dc_offset_db > -40.0);
        assert!(report.warnings.contains(&advisories.dc_offset_warning));
    }

    #[test]
    fn lopsided_channels_trigger_imbalance() {
        let advisories = AdvisoryCatalog::default();
        let tone = sine(440.0, 48_000, 0.4);
        let mut interleaved = Vec::new();
        for s in &tone {
            interleaved.push(*s);
            interleaved.push(*s * 0.5);
        }
        let buf = AudioBuffer::new(interleaved, 2, 48_000);
        let report = analyze_qa(&buf, &advisories);

        assert!(report.channel_imbalance_db > 1.5);
        assert!(report.warnings.contains(&advisories.imbalance_warning));
    }

    #[test]
    fn odd_source_rate_triggers_a_warning() {
        let advisories = AdvisoryCatalog::default();
        let mut buf = AudioBuffer::new(sine(440.0, 48_000, 0.3), 1, 48_000);
        buf.source_sample_rate = 22_050;
        let report = analyze_qa(&buf, &advisories);
        assert!(report.warnings.contains(&advisories.sample_rate_warning));
    }
}
