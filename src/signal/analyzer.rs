//! Signal Analyzer
//!
//! Synthesises labelled [`SignalRecord`]s from a [`SampleSource`] and computes
//! power, amplitude, dominant frequency and an SNR estimate for a record.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

use super::preprocess;
use super::source::{GaussianNoise, SampleSource};
use crate::config::RadioConfig;
use crate::data::model::{AnalysisReport, Metadata, MetadataValue, SignalRecord};
use crate::error::{AcquisitionError, AnalysisError};

/// Guard added to the variance in the SNR estimate.
pub const SNR_EPSILON: f64 = 1e-10;

/// Largest buffer a single synthesis may allocate.
pub const MAX_SAMPLES: usize = 1 << 28;

/// Sample count for a rate and duration: `round(rate * duration)`.
pub fn sample_count(sample_rate: f64, duration: f64) -> Result<usize, AcquisitionError> {
    let count = (sample_rate * duration).round();
    if !(count >= 1.0) {
        return Err(AcquisitionError::NonPositiveSampleCount {
            sample_rate,
            duration,
        });
    }
    if count > MAX_SAMPLES as f64 {
        return Err(AcquisitionError::InvalidParameter {
            name: "duration",
            detail: format!("{count} samples exceeds the limit of {MAX_SAMPLES}"),
        });
    }
    Ok(count as usize)
}

fn positive(name: &'static str, value: f64) -> Result<(), AcquisitionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AcquisitionError::InvalidParameter {
            name,
            detail: format!("{value} is not a positive finite number"),
        })
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// SignalAnalyzer
// ---------------------------------------------------------------------------

/// Synthesis front end plus analysis for one configured receiver.
pub struct SignalAnalyzer {
    config: RadioConfig,
    source: Box<dyn SampleSource>,
    history: Option<History>,
}

impl SignalAnalyzer {
    /// Analyzer over a config snapshot with the default Gaussian noise source.
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config,
            source: Box::new(GaussianNoise::default()),
            history: None,
        }
    }

    pub fn with_source(mut self, source: impl SampleSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Keep the last `capacity` records (minimum 1), discarding the oldest.
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = Some(History::new(capacity));
        self
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Records kept by [`SignalAnalyzer::with_history`], oldest first.
    pub fn history(&self) -> impl Iterator<Item = &SignalRecord> {
        self.history.iter().flat_map(|h| h.records.iter())
    }

    /// Synthesise `duration` seconds at the configured rate and frequency.
    pub fn acquire(&mut self, duration: f64) -> Result<SignalRecord, AcquisitionError> {
        self.synthesize(self.config.sample_rate, self.config.center_freq, duration)
    }

    /// Draw `round(sample_rate * duration)` samples, normalise and smooth
    /// them, and label the result.
    pub fn synthesize(
        &mut self,
        sample_rate: f64,
        center_freq: f64,
        duration: f64,
    ) -> Result<SignalRecord, AcquisitionError> {
        positive("sample_rate", sample_rate)?;
        positive("center_freq", center_freq)?;
        let count = sample_count(sample_rate, duration)?;
        log::info!(
            "acquiring {count} samples at {center_freq} Hz, {sample_rate} S/s ({})",
            self.source.name()
        );

        let raw = self.source.generate(count)?;
        if raw.len() != count {
            return Err(AcquisitionError::Source(format!(
                "{} produced {} samples, expected {count}",
                self.source.name(),
                raw.len()
            )));
        }
        if let Some(idx) = raw.iter().position(|s| !s.re.is_finite() || !s.im.is_finite()) {
            return Err(AcquisitionError::Source(format!(
                "{} produced a non-finite sample at index {idx}",
                self.source.name()
            )));
        }

        let samples = preprocess::condition(raw);
        let record = SignalRecord::new(
            samples,
            sample_rate,
            center_freq,
            now_secs(),
            self.metadata(duration),
        )?;
        log::info!("acquisition complete, {} samples", record.len());

        if let Some(history) = &mut self.history {
            history.push(record.clone());
        }
        Ok(record)
    }

    fn metadata(&self, duration: f64) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("device_id".into(), self.config.device_id.as_str().into());
        metadata.insert("gain".into(), MetadataValue::from(&self.config.gain));
        metadata.insert("duration".into(), duration.into());
        metadata.insert("data_type".into(), self.config.output_format.as_str().into());
        metadata.insert("source".into(), self.source.name().into());
        metadata
    }

    pub fn analyze(&self, record: &SignalRecord) -> Result<AnalysisReport, AnalysisError> {
        analyze(record)
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Frequency of FFT bin `idx` for an `n`-point transform (negative above n/2).
pub fn bin_frequency(idx: usize, n: usize, sample_rate: f64) -> f64 {
    let k = if 2 * idx < n {
        idx as f64
    } else {
        idx as f64 - n as f64
    };
    k * sample_rate / n as f64
}

/// Magnitude of the DFT of `samples`.
pub fn magnitude_spectrum(samples: &[Complex64]) -> Vec<f64> {
    let mut buffer = samples.to_vec();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.norm()).collect()
}

/// Power, amplitude, dominant frequency and SNR estimate of a record.
pub fn analyze(record: &SignalRecord) -> Result<AnalysisReport, AnalysisError> {
    analyze_samples(record.samples(), record.sample_rate())
}

pub fn analyze_samples(
    samples: &[Complex64],
    sample_rate: f64,
) -> Result<AnalysisReport, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::Empty);
    }
    let n = samples.len();
    let nf = n as f64;

    let power = samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / nf;
    let amplitude = samples.iter().map(|s| s.norm()).sum::<f64>() / nf;

    let mean = samples.iter().sum::<Complex64>() / nf;
    let variance = samples.iter().map(|s| (s - mean).norm_sqr()).sum::<f64>() / nf;
    let snr_estimate = 10.0 * (power / (variance + SNR_EPSILON)).log10();

    let spectrum = magnitude_spectrum(samples);
    let mut peak_idx = 0;
    let mut spectrum_peak = f64::NEG_INFINITY;
    for (idx, &mag) in spectrum.iter().enumerate() {
        // Strict comparison keeps the first maximum.
        if mag > spectrum_peak {
            spectrum_peak = mag;
            peak_idx = idx;
        }
    }
    let main_frequency = bin_frequency(peak_idx, n, sample_rate);

    for (field, value) in [
        ("power", power),
        ("amplitude", amplitude),
        ("snr_estimate", snr_estimate),
        ("spectrum_peak", spectrum_peak),
        ("main_frequency", main_frequency),
    ] {
        if !value.is_finite() {
            return Err(AnalysisError::NonFinite { field });
        }
    }

    log::info!("analysis complete, main frequency {main_frequency:.2} Hz");
    Ok(AnalysisReport {
        power,
        amplitude,
        main_frequency,
        snr_estimate,
        spectrum_peak,
        data_length: n,
    })
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Bounded FIFO of recent records.
struct History {
    capacity: usize,
    records: VecDeque<SignalRecord>,
}

impl History {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, record: SignalRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }
}
