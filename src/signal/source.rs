//! Sample Sources
//!
//! Stand-ins for a receiver driver: anything that can hand over a finite
//! block of complex baseband samples. The analyzer only sees this trait, so a
//! hardware backend would slot in beside the synthetic generators here.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rustfft::num_complex::Complex64;

use crate::error::AcquisitionError;

/// Default noise standard deviation of the synthetic receiver.
pub const DEFAULT_NOISE_STD: f64 = 0.1;

/// Producer of complex samples.
pub trait SampleSource: Send {
    /// Produce exactly `count` samples.
    fn generate(&mut self, count: usize) -> Result<Vec<Complex64>, AcquisitionError>;

    /// Short label for logs and record metadata.
    fn name(&self) -> &'static str;
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, AcquisitionError> {
    if !mean.is_finite() {
        return Err(AcquisitionError::InvalidParameter {
            name: "noise_mean",
            detail: format!("{mean} is not finite"),
        });
    }
    Normal::new(mean, std_dev).map_err(|e| AcquisitionError::InvalidParameter {
        name: "noise_std",
        detail: format!("{std_dev}: {e}"),
    })
}

// ---------------------------------------------------------------------------
// GaussianNoise
// ---------------------------------------------------------------------------

/// Independent Normal draws for I and Q.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    mean: f64,
    std_dev: f64,
    rng: StdRng,
}

impl GaussianNoise {
    /// Parameters are checked when samples are drawn, so a bad `std_dev`
    /// surfaces as an acquisition failure.
    pub fn new(mean: f64, std_dev: f64, seed: Option<u64>) -> Self {
        Self {
            mean,
            std_dev,
            rng: seeded_rng(seed),
        }
    }
}

impl Default for GaussianNoise {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_NOISE_STD, None)
    }
}

impl SampleSource for GaussianNoise {
    fn generate(&mut self, count: usize) -> Result<Vec<Complex64>, AcquisitionError> {
        let dist = normal(self.mean, self.std_dev)?;
        Ok((0..count)
            .map(|_| Complex64::new(dist.sample(&mut self.rng), dist.sample(&mut self.rng)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "gaussian_noise"
    }
}

// ---------------------------------------------------------------------------
// NoisyTone
// ---------------------------------------------------------------------------

/// Unit-amplitude complex tone plus Gaussian noise on each channel.
///
/// The phase continues across calls.
#[derive(Debug, Clone)]
pub struct NoisyTone {
    /// Tone frequency as a fraction of the sample rate.
    cycles_per_sample: f64,
    noise_std: f64,
    rng: StdRng,
    next_index: u64,
}

impl NoisyTone {
    pub fn new(cycles_per_sample: f64, noise_std: f64, seed: Option<u64>) -> Self {
        Self {
            cycles_per_sample,
            noise_std,
            rng: seeded_rng(seed),
            next_index: 0,
        }
    }
}

impl SampleSource for NoisyTone {
    fn generate(&mut self, count: usize) -> Result<Vec<Complex64>, AcquisitionError> {
        if !self.cycles_per_sample.is_finite() {
            return Err(AcquisitionError::InvalidParameter {
                name: "cycles_per_sample",
                detail: format!("{} is not finite", self.cycles_per_sample),
            });
        }
        let noise = normal(0.0, self.noise_std)?;
        let start = self.next_index;
        let samples = (0..count as u64)
            .map(|k| {
                let phase = 2.0 * PI * self.cycles_per_sample * (start + k) as f64;
                Complex64::new(
                    phase.cos() + noise.sample(&mut self.rng),
                    phase.sin() + noise.sample(&mut self.rng),
                )
            })
            .collect();
        self.next_index = start + count as u64;
        Ok(samples)
    }

    fn name(&self) -> &'static str {
        "noisy_tone"
    }
}

// ---------------------------------------------------------------------------
// FixedSamples
// ---------------------------------------------------------------------------

/// Deterministic source cycling through a fixed pattern.
#[derive(Debug, Clone)]
pub struct FixedSamples {
    pattern: Vec<Complex64>,
    position: usize,
}

impl FixedSamples {
    pub fn new(pattern: Vec<Complex64>) -> Self {
        Self {
            pattern,
            position: 0,
        }
    }
}

impl SampleSource for FixedSamples {
    fn generate(&mut self, count: usize) -> Result<Vec<Complex64>, AcquisitionError> {
        if self.pattern.is_empty() {
            return Err(AcquisitionError::Source("fixed pattern is empty".into()));
        }
        let samples = (0..count)
            .map(|k| self.pattern[(self.position + k) % self.pattern.len()])
            .collect();
        self.position = (self.position + count) % self.pattern.len();
        Ok(samples)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gaussian_seeded_is_reproducible() {
        let a = GaussianNoise::new(0.0, 0.1, Some(42)).generate(128).unwrap();
        let b = GaussianNoise::new(0.0, 0.1, Some(42)).generate(128).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn test_gaussian_moments() {
        let samples = GaussianNoise::new(0.0, 0.1, Some(7)).generate(20_000).unwrap();
        let n = samples.len() as f64;
        let mean_re = samples.iter().map(|s| s.re).sum::<f64>() / n;
        let var_re = samples.iter().map(|s| (s.re - mean_re).powi(2)).sum::<f64>() / n;
        assert_abs_diff_eq!(mean_re, 0.0, epsilon = 0.01);
        assert_abs_diff_eq!(var_re.sqrt(), 0.1, epsilon = 0.01);
    }

    #[test]
    fn test_gaussian_invalid_std() {
        let err = GaussianNoise::new(0.0, -1.0, Some(1)).generate(10).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::InvalidParameter { name: "noise_std", .. }
        ));
        let err = GaussianNoise::new(f64::NAN, 0.1, Some(1)).generate(10).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::InvalidParameter { name: "noise_mean", .. }
        ));
    }

    #[test]
    fn test_tone_without_noise() {
        let mut tone = NoisyTone::new(0.25, 0.0, Some(0));
        let first = tone.generate(2).unwrap();
        let second = tone.generate(2).unwrap();
        let all: Vec<Complex64> = first.into_iter().chain(second).collect();
        let expected = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
        for (s, (re, im)) in all.iter().zip(expected) {
            assert_abs_diff_eq!(s.re, re, epsilon = 1e-12);
            assert_abs_diff_eq!(s.im, im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fixed_samples_cycle() {
        let pattern = vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0), Complex64::new(3.0, 0.0)];
        let mut src = FixedSamples::new(pattern);
        let a: Vec<f64> = src.generate(4).unwrap().iter().map(|s| s.re).collect();
        let b: Vec<f64> = src.generate(2).unwrap().iter().map(|s| s.re).collect();
        assert_eq!(a, vec![1.0, 2.0, 3.0, 1.0]);
        assert_eq!(b, vec![2.0, 3.0]);
        assert!(FixedSamples::new(Vec::new()).generate(1).is_err());
    }
}
