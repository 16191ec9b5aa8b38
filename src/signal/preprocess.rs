use rustfft::num_complex::Complex64;

/// Upper bound on the smoothing window.
pub const MAX_SMOOTHING_WINDOW: usize = 100;

/// Scale samples so the largest magnitude becomes 1.
///
/// Returns `false` (buffer untouched) when every sample is zero.
pub fn normalize(samples: &mut [Complex64]) -> bool {
    let peak = samples.iter().map(|s| s.norm()).fold(0.0, f64::max);
    if peak == 0.0 {
        return false;
    }
    for s in samples.iter_mut() {
        *s /= peak;
    }
    true
}

/// Window used for a buffer of `len` samples: `min(100, len / 10)`.
pub fn smoothing_window(len: usize) -> usize {
    MAX_SMOOTHING_WINDOW.min(len / 10)
}

/// Boxcar moving average with centred, same-length output.
///
/// Equivalent to the full linear convolution with a `window`-tap kernel of
/// `1/window`, truncated to the input length starting at `(window - 1) / 2`.
/// Windows of 0 or 1 return the input unchanged.
pub fn moving_average(samples: &[Complex64], window: usize) -> Vec<Complex64> {
    if window <= 1 || samples.is_empty() {
        return samples.to_vec();
    }
    let n = samples.len();
    let scale = 1.0 / window as f64;
    let offset = (window - 1) / 2;

    // prefix[k] = sum of samples[..k]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(Complex64::new(0.0, 0.0));
    for (k, s) in samples.iter().enumerate() {
        prefix.push(prefix[k] + s);
    }

    (0..n)
        .map(|k| {
            // full[t] sums samples[t + 1 - window ..= t], clipped to the buffer
            let t = k + offset;
            let hi = (t + 1).min(n);
            let lo = (t + 1).saturating_sub(window);
            (prefix[hi] - prefix[lo]) * scale
        })
        .collect()
}

/// Normalise, then smooth with [`smoothing_window`].
pub fn condition(mut samples: Vec<Complex64>) -> Vec<Complex64> {
    if !normalize(&mut samples) {
        log::warn!("preprocess: all-zero buffer, normalisation skipped");
    }
    let window = smoothing_window(samples.len());
    if window <= 1 {
        log::debug!("preprocess: {} samples, smoothing skipped", samples.len());
        return samples;
    }
    log::debug!("preprocess: moving average, window {window}");
    moving_average(&samples, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn real(values: &[f64]) -> Vec<Complex64> {
        values.iter().map(|&v| Complex64::new(v, 0.0)).collect()
    }

    /// Direct evaluation of the truncated full convolution.
    fn reference_same(samples: &[Complex64], window: usize) -> Vec<Complex64> {
        let n = samples.len();
        let full_len = n + window - 1;
        let mut full = vec![Complex64::new(0.0, 0.0); full_len];
        for (t, out) in full.iter_mut().enumerate() {
            for j in 0..window {
                if t >= j && t - j < n {
                    *out += samples[t - j] / window as f64;
                }
            }
        }
        let start = (window - 1) / 2;
        full[start..start + n].to_vec()
    }

    #[test]
    fn test_normalize_peak_is_one() {
        let mut samples = vec![Complex64::new(3.0, 4.0), Complex64::new(0.5, 0.0), Complex64::new(-1.0, 1.0)];
        assert!(normalize(&mut samples));
        let peak = samples.iter().map(|s| s.norm()).fold(0.0, f64::max);
        assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(samples[1].re, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_all_zero_is_noop() {
        let mut samples = vec![Complex64::new(0.0, 0.0); 8];
        assert!(!normalize(&mut samples));
        assert!(samples.iter().all(|s| s.re == 0.0 && s.im == 0.0 && s.re.is_finite()));
    }

    #[test]
    fn test_moving_average_odd_window() {
        // [1,2,3] * [1/3,1/3,1/3] full = [1,3,6,5,3]/3, same = [3,6,5]/3
        let out = moving_average(&real(&[1.0, 2.0, 3.0]), 3);
        let expected = [1.0, 2.0, 5.0 / 3.0];
        for (o, e) in out.iter().zip(expected) {
            assert_abs_diff_eq!(o.re, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_moving_average_even_window() {
        // full = [1,3,5,3]/2, same starts at 0 → [0.5, 1.5, 2.5]
        let out = moving_average(&real(&[1.0, 2.0, 3.0]), 2);
        let expected = [0.5, 1.5, 2.5];
        for (o, e) in out.iter().zip(expected) {
            assert_abs_diff_eq!(o.re, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_moving_average_matches_reference() {
        let samples: Vec<Complex64> = (0..137)
            .map(|k| Complex64::new((k as f64 * 0.7).sin(), (k as f64 * 0.19).cos()))
            .collect();
        for window in [2, 3, 10, 13, 100] {
            let fast = moving_average(&samples, window);
            let slow = reference_same(&samples, window);
            assert_eq!(fast.len(), samples.len());
            for (a, b) in fast.iter().zip(&slow) {
                assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-9);
                assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_window_size() {
        assert_eq!(smoothing_window(5), 0);
        assert_eq!(smoothing_window(19), 1);
        assert_eq!(smoothing_window(20), 2);
        assert_eq!(smoothing_window(240_000), 100);
    }

    #[test]
    fn test_condition_short_buffer_is_only_normalised() {
        let out = condition(real(&[2.0, -4.0, 1.0]));
        assert_eq!(out, real(&[0.5, -1.0, 0.25]));
    }
}
