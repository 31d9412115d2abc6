//! Shared numeric helpers for the extractors
//!
//! Every helper floors its inputs so that degenerate buffers (silence, very
//! short clips) produce finite values instead of NaN/Inf.

/// Additive floor applied before divisions and logarithms
pub const FLOOR: f64 = 1e-9;

/// Linear value to dB with the standard floor (minimum −180 dB)
pub fn db(value: f64) -> f64 {
    20.0 * value.max(FLOOR).log10()
}

/// Root-mean-square of a signal; 0.0 for an empty slice
pub fn rms(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = signal.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / signal.len() as f64).sqrt()
}

/// Mean energy (mean of squares); 0.0 for an empty slice
pub fn mean_square(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / signal.len() as f64
}

/// Windowed RMS values; falls back to a single whole-buffer RMS when the
/// buffer is shorter than one window
pub fn windowed_rms(signal: &[f32], window: usize, hop: usize) -> Vec<f64> {
    let mut values = Vec::new();
    if signal.len() > window && hop > 0 {
        let mut start = 0;
        while start < signal.len() - window {
            values.push(rms(&signal[start..start + window]));
            start += hop;
        }
    }
    if values.is_empty() {
        values.push(rms(signal));
    }
    values
}

/// Linearly interpolated percentile (p in [0, 100]); 0.0 for an empty slice
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

/// Percentile over f32 values
pub fn percentile_f32(values: &[f32], p: f64) -> f64 {
    let as_f64: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    percentile(&as_f64, p)
}

/// Pearson correlation of two equal-length signals
///
/// Returns 1.0 when either signal has no variance; degenerate identical
/// inputs count as perfectly correlated rather than undefined.
pub fn pearson(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 1.0;
    }
    let mean_a = a[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for i in 0..n {
        let da = a[i] as f64 - mean_a;
        let db_ = b[i] as f64 - mean_b;
        cov += da * db_;
        var_a += da * da;
        var_b += db_ * db_;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < FLOOR {
        return 1.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Mean magnitude within a frequency band of an averaged spectrum
pub fn band_energy(magnitudes: &[f32], freqs: &[f32], low: f32, high: f32) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (m, f) in magnitudes.iter().zip(freqs) {
        if *f >= low && *f < high {
            sum += *m as f64;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_is_floored_for_silence() {
        assert_eq!(db(0.0), 20.0 * FLOOR.log10());
        assert!(db(0.0).is_finite());
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![0.0, 10.0];
        assert!((percentile(&values, 50.0) - 5.0).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
    }

    #[test]
    fn windowed_rms_falls_back_on_short_input() {
        let signal = vec![0.5f32; 100];
        let values = windowed_rms(&signal, 1000, 500);
        assert_eq!(values.len(), 1);
        assert!((values[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_identical_signals_is_one() {
        let a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_inverted_signals_is_minus_one() {
        let a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        let b: Vec<f32> = a.iter().map(|v| -v).collect();
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_constant_signal_defaults_to_one() {
        let a = vec![0.0f32; 64];
        assert_eq!(pearson(&a, &a), 1.0);
    }
}
