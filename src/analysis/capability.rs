//! Injected numeric capabilities
//!
//! Every extractor that needs a numeric backend (short-time transform,
//! loudness meter, onset detector, resampler) resolves it here at
//! construction time and fails fast with a `Configuration` error when the
//! capability is not registered. No extractor branches on availability at
//! its call sites.

use crate::analysis::buffer::AudioBuffer;
use crate::error::{AnalysisError, AnalysisResult};
use ebur128::{EbuR128, Mode};
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

/// Magnitude spectrogram produced by a [`SpectralTransform`]
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Bin center frequencies in Hz (length = window/2 + 1)
    pub freqs: Vec<f32>,
    /// Magnitude frames, one per analysis hop
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    /// Time-averaged magnitude spectrum
    pub fn average(&self) -> Vec<f32> {
        if self.frames.is_empty() {
            return vec![0.0; self.freqs.len()];
        }
        let mut avg = vec![0.0f32; self.freqs.len()];
        for frame in &self.frames {
            for (a, m) in avg.iter_mut().zip(frame) {
                *a += m;
            }
        }
        let scale = 1.0 / self.frames.len() as f32;
        for a in &mut avg {
            *a *= scale;
        }
        avg
    }
}

/// Short-time magnitude transform
pub trait SpectralTransform: Send + Sync {
    fn magnitude_spectrogram(
        &self,
        samples: &[f32],
        sample_rate: u32,
        window: usize,
        hop: usize,
    ) -> AnalysisResult<Spectrogram>;
}

/// BS.1770 loudness metering
pub trait LoudnessMeter: Send + Sync {
    /// Gated integrated loudness over the whole buffer (LUFS)
    fn integrated_lufs(&self, buffer: &AudioBuffer) -> AnalysisResult<f64>;

    /// Short-term loudness series: 3 s window, 1 s hop. Empty when the
    /// buffer is shorter than one window.
    fn short_term_series(&self, buffer: &AudioBuffer) -> AnalysisResult<Vec<f64>>;

    /// True peak in dBTP, estimated with 4x oversampling
    fn true_peak_db(&self, buffer: &AudioBuffer) -> AnalysisResult<f64>;
}

/// Onset strength envelope
#[derive(Debug, Clone)]
pub struct OnsetEnvelope {
    /// Onset strength per frame transition, normalized to [0, 1]
    pub values: Vec<f32>,
    /// Hop size in samples between envelope frames
    pub hop: usize,
}

impl OnsetEnvelope {
    /// Envelope frame rate in Hz
    pub fn frame_rate(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.hop as f32
    }
}

/// Onset strength detection
pub trait OnsetDetector: Send + Sync {
    fn onset_envelope(&self, mono: &[f32], sample_rate: u32) -> AnalysisResult<OnsetEnvelope>;
}

/// Sample-rate conversion over de-interleaved channel data
pub trait AudioResampler: Send + Sync {
    fn resample(
        &self,
        channels: Vec<Vec<f32>>,
        source_rate: u32,
        target_rate: u32,
    ) -> AnalysisResult<Vec<Vec<f32>>>;
}

/// Registry of numeric capabilities available to the pipeline
///
/// `Capabilities::default()` registers the production backends. Tests may
/// construct an empty registry to exercise the fail-fast paths.
pub struct Capabilities {
    spectral: Option<Arc<dyn SpectralTransform>>,
    loudness: Option<Arc<dyn LoudnessMeter>>,
    onsets: Option<Arc<dyn OnsetDetector>>,
    resampler: Option<Arc<dyn AudioResampler>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            spectral: Some(Arc::new(FftSpectralTransform)),
            loudness: Some(Arc::new(Ebur128Meter)),
            onsets: Some(Arc::new(EnergyFluxDetector::default())),
            resampler: Some(Arc::new(SincResampler)),
        }
    }
}

impl Capabilities {
    /// Registry with no backends; every resolution fails
    pub fn empty() -> Self {
        Self {
            spectral: None,
            loudness: None,
            onsets: None,
            resampler: None,
        }
    }

    pub fn spectral(&self) -> AnalysisResult<Arc<dyn SpectralTransform>> {
        self.spectral
            .clone()
            .ok_or_else(|| AnalysisError::Configuration("No spectral transform registered".into()))
    }

    pub fn loudness(&self) -> AnalysisResult<Arc<dyn LoudnessMeter>> {
        self.loudness
            .clone()
            .ok_or_else(|| AnalysisError::Configuration("No loudness meter registered".into()))
    }

    pub fn onsets(&self) -> AnalysisResult<Arc<dyn OnsetDetector>> {
        self.onsets
            .clone()
            .ok_or_else(|| AnalysisError::Configuration("No onset detector registered".into()))
    }

    pub fn resampler(&self) -> AnalysisResult<Arc<dyn AudioResampler>> {
        self.resampler
            .clone()
            .ok_or_else(|| AnalysisError::Configuration("No resampler registered".into()))
    }
}

// ---------------------------------------------------------------------------
// Default backends
// ---------------------------------------------------------------------------

/// Hann-windowed STFT backed by rustfft
pub struct FftSpectralTransform;

impl SpectralTransform for FftSpectralTransform {
    fn magnitude_spectrogram(
        &self,
        samples: &[f32],
        sample_rate: u32,
        window: usize,
        hop: usize,
    ) -> AnalysisResult<Spectrogram> {
        if window == 0 || hop == 0 {
            return Err(AnalysisError::Processing(
                "STFT window and hop must be non-zero".into(),
            ));
        }

        let bins = window / 2 + 1;
        let freqs: Vec<f32> = (0..bins)
            .map(|i| i as f32 * sample_rate as f32 / window as f32)
            .collect();

        let hann: Vec<f32> = (0..window)
            .map(|i| {
                let phase = std::f32::consts::PI * 2.0 * i as f32 / window as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        let win_sum: f32 = hann.iter().sum();
        let scale = 1.0 / win_sum.max(1e-9);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window);

        // Short inputs are zero-padded into a single frame.
        let num_frames = if samples.len() >= window {
            (samples.len() - window) / hop + 1
        } else {
            1
        };

        let mut frames = Vec::with_capacity(num_frames);
        let mut input = vec![Complex::new(0.0f32, 0.0); window];
        for frame_idx in 0..num_frames {
            let start = frame_idx * hop;
            for (i, slot) in input.iter_mut().enumerate() {
                let sample = samples.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * hann[i], 0.0);
            }
            fft.process(&mut input);
            frames.push(input[..bins].iter().map(|c| c.norm() * scale).collect());
        }

        Ok(Spectrogram { freqs, frames })
    }
}

/// BS.1770 metering backed by the ebur128 crate
pub struct Ebur128Meter;

impl Ebur128Meter {
    fn map_err(e: ebur128::Error) -> AnalysisError {
        AnalysisError::Processing(format!("Loudness meter failed: {}", e))
    }
}

impl LoudnessMeter for Ebur128Meter {
    fn integrated_lufs(&self, buffer: &AudioBuffer) -> AnalysisResult<f64> {
        let mut meter = EbuR128::new(buffer.channels() as u32, buffer.sample_rate, Mode::I)
            .map_err(Self::map_err)?;
        meter
            .add_frames_f32(buffer.interleaved())
            .map_err(Self::map_err)?;
        meter.loudness_global().map_err(Self::map_err)
    }

    fn short_term_series(&self, buffer: &AudioBuffer) -> AnalysisResult<Vec<f64>> {
        let window_frames = 3 * buffer.sample_rate as usize;
        if buffer.frames() < window_frames {
            return Ok(Vec::new());
        }

        let mut meter = EbuR128::new(buffer.channels() as u32, buffer.sample_rate, Mode::S)
            .map_err(Self::map_err)?;

        let hop_samples = buffer.sample_rate as usize * buffer.channels();
        let mut fed_frames = 0usize;
        let mut series = Vec::new();
        for chunk in buffer.interleaved().chunks(hop_samples) {
            meter.add_frames_f32(chunk).map_err(Self::map_err)?;
            fed_frames += chunk.len() / buffer.channels();
            if fed_frames >= window_frames {
                let value = meter.loudness_shortterm().map_err(Self::map_err)?;
                if value.is_finite() {
                    series.push(value);
                }
            }
        }
        Ok(series)
    }

    fn true_peak_db(&self, buffer: &AudioBuffer) -> AnalysisResult<f64> {
        let mut meter = EbuR128::new(buffer.channels() as u32, buffer.sample_rate, Mode::TRUE_PEAK)
            .map_err(Self::map_err)?;
        meter
            .add_frames_f32(buffer.interleaved())
            .map_err(Self::map_err)?;

        let mut peak = 0.0f64;
        for ch in 0..buffer.channels() as u32 {
            peak = peak.max(meter.true_peak(ch).map_err(Self::map_err)?);
        }
        Ok(20.0 * peak.max(1e-9).log10())
    }
}

/// Energy-flux onset strength: positive frame-to-frame RMS derivative,
/// normalized by the envelope peak
pub struct EnergyFluxDetector {
    frame_size: usize,
    hop_size: usize,
}

impl Default for EnergyFluxDetector {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
        }
    }
}

impl OnsetDetector for EnergyFluxDetector {
    fn onset_envelope(&self, mono: &[f32], _sample_rate: u32) -> AnalysisResult<OnsetEnvelope> {
        let num_frames = if mono.len() >= self.frame_size {
            (mono.len() - self.frame_size) / self.hop_size + 1
        } else {
            0
        };

        if num_frames < 2 {
            return Ok(OnsetEnvelope {
                values: vec![0.0],
                hop: self.hop_size,
            });
        }

        let mut energies = Vec::with_capacity(num_frames);
        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            let frame = &mono[start..start + self.frame_size];
            let sum_squares: f32 = frame.iter().map(|s| s * s).sum();
            energies.push((sum_squares / self.frame_size as f32).sqrt());
        }

        let mut flux: Vec<f32> = energies
            .windows(2)
            .map(|w| (w[1] - w[0]).max(0.0))
            .collect();

        let peak = flux.iter().copied().fold(0.0f32, f32::max);
        if peak > 0.0 {
            for v in &mut flux {
                *v /= peak;
            }
        }

        Ok(OnsetEnvelope {
            values: flux,
            hop: self.hop_size,
        })
    }
}

/// Polyphase sinc resampler backed by rubato
///
/// 256-tap filter, 0.95 cutoff, BlackmanHarris2 window; single-pass chunk
/// sized to the input.
pub struct SincResampler;

impl AudioResampler for SincResampler {
    fn resample(
        &self,
        channels: Vec<Vec<f32>>,
        source_rate: u32,
        target_rate: u32,
    ) -> AnalysisResult<Vec<Vec<f32>>> {
        if source_rate == target_rate || channels.is_empty() || channels[0].is_empty() {
            return Ok(channels);
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let ratio = target_rate as f64 / source_rate as f64;
        let num_frames = channels[0].len();

        let mut resampler = SincFixedIn::<f32>::new(
            ratio,
            16.0, // generous headroom for unusual source rates
            params,
            num_frames,
            channels.len(),
        )
        .map_err(|e| AnalysisError::Processing(format!("Failed to create resampler: {}", e)))?;

        resampler
            .process(&channels, None)
            .map_err(|e| AnalysisError::Processing(format!("Resampling failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
        let n = (secs * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.1 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn empty_registry_fails_resolution() {
        let caps = Capabilities::empty();
        assert!(matches!(
            caps.spectral(),
            Err(AnalysisError::Configuration(_))
        ));
        assert!(matches!(
            caps.loudness(),
            Err(AnalysisError::Configuration(_))
        ));
        assert!(matches!(caps.onsets(), Err(AnalysisError::Configuration(_))));
        assert!(matches!(
            caps.resampler(),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn stft_peak_lands_on_tone_frequency() {
        let samples = sine(1000.0, 1.0, 48_000);
        let spec = FftSpectralTransform
            .magnitude_spectrogram(&samples, 48_000, 4096, 2048)
            .unwrap();
        let avg = spec.average();
        let peak_bin = avg
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let peak_freq = spec.freqs[peak_bin];
        assert!((peak_freq - 1000.0).abs() < 24.0, "peak at {} Hz", peak_freq);
    }

    #[test]
    fn stft_handles_sub_window_input() {
        let samples = vec![0.1f32; 100];
        let spec = FftSpectralTransform
            .magnitude_spectrogram(&samples, 48_000, 4096, 2048)
            .unwrap();
        assert_eq!(spec.frames.len(), 1);
        assert!(spec.frames[0].iter().all(|m| m.is_finite()));
    }

    #[test]
    fn onset_envelope_is_normalized() {
        // A burst in the middle produces a clear positive flux
        let mut samples = vec![0.0f32; 48_000];
        for s in samples[24_000..24_400].iter_mut() {
            *s = 0.9;
        }
        let env = EnergyFluxDetector::default()
            .onset_envelope(&samples, 48_000)
            .unwrap();
        let max = env.values.iter().copied().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(env.values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn onset_envelope_of_short_input_is_single_zero() {
        let env = EnergyFluxDetector::default()
            .onset_envelope(&[0.0f32; 64], 48_000)
            .unwrap();
        assert_eq!(env.values, vec![0.0]);
    }

    #[test]
    fn resampler_halves_length_at_double_rate() {
        let samples = sine(440.0, 1.0, 96_000);
        let out = SincResampler
            .resample(vec![samples], 96_000, 48_000)
            .unwrap();
        let expected = 48_000usize;
        let got = out[0].len();
        assert!(
            (got as i64 - expected as i64).unsigned_abs() < 1024,
            "expected ~{} frames, got {}",
            expected,
            got
        );
    }
}
