//! Decoded audio buffer
//!
//! Interleaved f32 samples, frame-major / channel-minor, always at the
//! canonical 48 kHz rate after ingestion. The buffer is immutable once
//! produced; mono and mid/side projections are computed copies.

/// Canonical analysis sample rate
pub const CANONICAL_SAMPLE_RATE: u32 = 48_000;

/// Decoded, resampled audio owned by one analysis job
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: usize,
    /// Sample rate of `samples` (canonical rate after ingestion)
    pub sample_rate: u32,
    /// Sample rate of the source file before resampling
    pub source_sample_rate: u32,
    /// Container/codec short name reported by the decoder
    pub source_format: Option<String>,
    /// Non-fatal observations gathered during ingestion
    pub warnings: Vec<String>,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        debug_assert!(channels >= 1);
        Self {
            samples,
            channels,
            sample_rate,
            source_sample_rate: sample_rate,
            source_format: None,
            warnings: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration_sec(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Interleaved samples, frame-major / channel-minor
    pub fn interleaved(&self) -> &[f32] {
        &self.samples
    }

    /// Extract a single channel
    pub fn channel(&self, index: usize) -> Vec<f32> {
        debug_assert!(index < self.channels);
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Channel-averaged mono projection
    pub fn mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as f32;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }

    /// Mid/side projection of the first stereo pair; `None` for mono input
    pub fn mid_side(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        if self.channels < 2 {
            return None;
        }
        let left = self.channel(0);
        let right = self.channel(1);
        let mid = left
            .iter()
            .zip(&right)
            .map(|(l, r)| 0.5 * (l + r))
            .collect();
        let side = left
            .iter()
            .zip(&right)
            .map(|(l, r)| 0.5 * (l - r))
            .collect();
        Some((mid, side))
    }
}
