//! Advisory and recommendation text
//!
//! All human-readable advisory strings live in this catalog so that wording
//! and language are swappable data, not code. The defaults are English; a
//! deployment may load a translated catalog from JSON (missing keys fall
//! back to the defaults).

use crate::error::{AnalysisError, AnalysisResult};
use serde::Deserialize;
use std::path::Path;

/// One masking band definition: display label, band edges, typical sources
#[derive(Debug, Clone, Deserialize)]
pub struct MaskingBandText {
    pub label: String,
    pub low_hz: f32,
    pub high_hz: f32,
    pub sources: String,
}

/// Swappable catalog of advisory strings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisoryCatalog {
    // Ingestion
    pub lossy_source: String,

    // Artifact detector notes
    pub gating_note: String,
    pub warble_note: String,
    pub crackle_note: String,
    pub codec_note: String,

    // QA warnings
    pub dc_offset_warning: String,
    pub imbalance_warning: String,
    pub sample_rate_warning: String,

    // Masking / low end
    pub masking_note: String,
    pub masking_bands: Vec<MaskingBandText>,
    pub sub_centered_note: String,
    pub wide_sub_note: String,

    // Transient / reverb notes
    pub transient_healthy: String,
    pub transient_soft: String,
    pub vocal_forward: String,
    pub vocal_pushed_back: String,

    // Tempo/key
    pub double_time_warning: String,
    pub half_time_warning: String,
    pub bpm_key_note: String,

    // Recording recommendations
    pub rec_deesser: String,
    pub rec_pop_filter: String,
    pub rec_room_treatment: String,
    pub rec_recording_ok: String,

    // Mixing recommendations
    pub rec_true_peak: String,
    pub rec_loudness_low: String,
    pub rec_loudness_high: String,
    pub rec_tilt_dark: String,
    pub rec_tilt_bright: String,
    pub rec_correlation: String,
    pub rec_mixing_ok: String,

    // Executive summary
    pub summary_on_target: String,
    pub summary_uneven: String,

    // Report appendix
    pub appendix_note: String,

    // A/B comparison summaries
    pub ab_brighter: String,
    pub ab_darker: String,
    pub ab_tilt_close: String,
    pub ab_wider: String,
    pub ab_narrower: String,
    pub ab_width_close: String,
    pub ab_phase_differs: String,
    pub ab_more_dynamic: String,
    pub ab_more_compressed: String,
    pub ab_dynamics_close: String,

    // A/B comparison suggestions
    pub ab_raise_loudness: String,
    pub ab_lower_loudness: String,
    pub ab_lower_true_peak: String,
    pub ab_tame_highs: String,
    pub ab_add_air: String,
    pub ab_narrow_width: String,
    pub ab_widen: String,
    pub ab_ease_compression: String,
    pub ab_close_to_reference: String,
}

impl Default for AdvisoryCatalog {
    fn default() -> Self {
        Self {
            lossy_source: "Lossy source upload detected; analysis may be less accurate.".into(),

            gating_note: "Gating artifacts suspected in low-level passages.".into(),
            warble_note: "Noise reduction warble/chirp patterns detected.".into(),
            crackle_note: "Crackle-like discontinuities detected.".into(),
            codec_note: "Lossy codec artifacts possible due to compressed source.".into(),

            dc_offset_warning: "Detectable DC offset; consider high-pass filtering or re-export."
                .into(),
            imbalance_warning: "Channel imbalance detected; check stereo balance.".into(),
            sample_rate_warning:
                "Non-standard sample rate detected; consider re-exporting at 48 kHz.".into(),

            masking_note: "Likely masking due to dense energy in this band.".into(),
            masking_bands: vec![
                MaskingBandText {
                    label: "60-120 Hz".into(),
                    low_hz: 60.0,
                    high_hz: 120.0,
                    sources: "kick + bass".into(),
                },
                MaskingBandText {
                    label: "120-250 Hz".into(),
                    low_hz: 120.0,
                    high_hz: 250.0,
                    sources: "bass fundamentals".into(),
                },
                MaskingBandText {
                    label: "250-500 Hz".into(),
                    low_hz: 250.0,
                    high_hz: 500.0,
                    sources: "low-mid mud".into(),
                },
                MaskingBandText {
                    label: "1-2 kHz".into(),
                    low_hz: 1000.0,
                    high_hz: 2000.0,
                    sources: "vocal body + guitars".into(),
                },
                MaskingBandText {
                    label: "2-4 kHz".into(),
                    low_hz: 2000.0,
                    high_hz: 4000.0,
                    sources: "vocal presence + synths".into(),
                },
                MaskingBandText {
                    label: "4-6 kHz".into(),
                    low_hz: 4000.0,
                    high_hz: 6000.0,
                    sources: "snare crack + vocal edge".into(),
                },
            ],
            sub_centered_note: "Sub energy is centered.".into(),
            wide_sub_note: "Wide sub detected; mono the sub-bass for safer translation.".into(),

            transient_healthy: "Transient detail looks healthy.".into(),
            transient_soft: "Transient punch may be softened.".into(),
            vocal_forward: "Vocal feels forward.".into(),
            vocal_pushed_back: "Vocal depth may be pushing back.".into(),

            double_time_warning: "Possible double-time interpretation".into(),
            half_time_warning: "Possible half-time interpretation".into(),
            bpm_key_note: "Best guess only; tempo/key can be ambiguous.".into(),

            rec_deesser: "Use a de-esser or softer microphone placement to control sibilance."
                .into(),
            rec_pop_filter: "Use a pop filter and increase microphone distance to reduce plosives."
                .into(),
            rec_room_treatment:
                "Reduce room reflections with damping or closer microphone technique.".into(),
            rec_recording_ok: "Recording quality looks good; focus on mix adjustments.".into(),

            rec_true_peak: "Reduce true peak by lowering the limiter ceiling or adjusting gain."
                .into(),
            rec_loudness_low: "Raise overall loudness with gentle bus compression and limiting."
                .into(),
            rec_loudness_high: "Reduce master gain to hit the genre loudness target.".into(),
            rec_tilt_dark: "Add presence/air to balance the top end for the genre.".into(),
            rec_tilt_bright: "Tame upper mids or treble for a softer balance.".into(),
            rec_correlation: "Check mono compatibility; the phase correlation is negative.".into(),
            rec_mixing_ok: "The mix is close to target; make small tone and loudness tweaks."
                .into(),

            summary_on_target:
                "Overall balance is good, with a few targeted improvements needed.".into(),
            summary_uneven:
                "Mix quality is uneven; prioritize the lowest-scoring areas first.".into(),

            appendix_note: "Technical appendix includes measured values for reference.".into(),

            ab_brighter: "Mix is brighter than the reference.".into(),
            ab_darker: "Mix is darker than the reference.".into(),
            ab_tilt_close: "Spectral tilt is close to the reference.".into(),
            ab_wider: "Mix is wider than the reference.".into(),
            ab_narrower: "Mix is narrower than the reference.".into(),
            ab_width_close: "Stereo width is close to the reference.".into(),
            ab_phase_differs: "Phase correlation differs; check mono compatibility.".into(),
            ab_more_dynamic: "Mix has more dynamic range than the reference.".into(),
            ab_more_compressed: "Mix is more compressed than the reference.".into(),
            ab_dynamics_close: "Dynamics are close to the reference.".into(),

            ab_raise_loudness: "Increase overall loudness slightly while preserving transients."
                .into(),
            ab_lower_loudness: "Reduce overall loudness to match the reference headroom.".into(),
            ab_lower_true_peak: "Lower limiter ceiling or reduce peaks to align true peak.".into(),
            ab_tame_highs: "Tame high-end or add warmth in low-mids for a closer tonal balance."
                .into(),
            ab_add_air: "Add presence/air to approach the reference brightness.".into(),
            ab_narrow_width: "Narrow wide elements or check mono compatibility for closer width."
                .into(),
            ab_widen: "Enhance stereo width with subtle mid/side EQ or spatial effects.".into(),
            ab_ease_compression: "Ease bus compression to regain punch and crest factor.".into(),
            ab_close_to_reference: "Overall close to the reference; focus on minor tweaks only."
                .into(),
        }
    }
}

impl AdvisoryCatalog {
    /// Load a catalog from JSON; missing keys keep their English defaults
    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AnalysisError::Configuration(format!("Invalid advisory catalog: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_masking_bands() {
        let catalog = AdvisoryCatalog::default();
        assert_eq!(catalog.masking_bands.len(), 6);
        assert!(catalog.masking_bands.iter().all(|b| b.low_hz < b.high_hz));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let catalog: AdvisoryCatalog =
            serde_json::from_str(r#"{"lossy_source": "translated"}"#).unwrap();
        assert_eq!(catalog.lossy_source, "translated");
        assert_eq!(
            catalog.gating_note,
            AdvisoryCatalog::default().gating_note
        );
    }
}
