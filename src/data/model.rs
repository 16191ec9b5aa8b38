use std::collections::BTreeMap;
use std::fmt;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::AcquisitionError;

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata scalar
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata scalar (device id, gain, duration, format...).
///
/// Serialised untagged so the JSON form is the plain scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// False only for a `Float` holding NaN or an infinity.
    pub fn is_finite(&self) -> bool {
        match self {
            MetadataValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

/// String-keyed scalar mapping attached to every record.
pub type Metadata = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// SignalRecord – one acquisition
// ---------------------------------------------------------------------------

/// One acquisition: samples plus the parameters they were taken with.
///
/// Immutable once built; every constructor guarantees at least one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    samples: Vec<Complex64>,
    sample_rate: f64,
    center_freq: f64,
    /// Seconds since the Unix epoch.
    timestamp: f64,
    metadata: Metadata,
}

impl SignalRecord {
    /// Build a record, rejecting empty sample buffers, non-positive rates and
    /// any non-finite value, which no container can store faithfully.
    pub fn new(
        samples: Vec<Complex64>,
        sample_rate: f64,
        center_freq: f64,
        timestamp: f64,
        metadata: Metadata,
    ) -> Result<Self, AcquisitionError> {
        if samples.is_empty() {
            return Err(AcquisitionError::NonPositiveSampleCount {
                sample_rate,
                duration: 0.0,
            });
        }
        check_positive("sample_rate", sample_rate)?;
        check_positive("center_freq", center_freq)?;
        if let Some(idx) = samples
            .iter()
            .position(|s| !(s.re.is_finite() && s.im.is_finite()))
        {
            return Err(AcquisitionError::InvalidParameter {
                name: "samples",
                detail: format!("sample {idx} is not finite"),
            });
        }
        if !timestamp.is_finite() {
            return Err(AcquisitionError::InvalidParameter {
                name: "timestamp",
                detail: format!("{timestamp} is not finite"),
            });
        }
        if let Some((key, value)) = metadata.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AcquisitionError::InvalidParameter {
                name: "metadata",
                detail: format!("'{key}' = {value} is not finite"),
            });
        }
        Ok(Self::from_parts(
            samples,
            sample_rate,
            center_freq,
            timestamp,
            metadata,
        ))
    }

    /// Unchecked constructor for callers that already validated the parts.
    pub(crate) fn from_parts(
        samples: Vec<Complex64>,
        sample_rate: f64,
        center_freq: f64,
        timestamp: f64,
        metadata: Metadata,
    ) -> Self {
        Self {
            samples,
            sample_rate,
            center_freq,
            timestamp,
            metadata,
        }
    }

    pub fn samples(&self) -> &[Complex64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of samples (always > 0).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Acquisition length in seconds implied by the sample count.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), AcquisitionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AcquisitionError::InvalidParameter {
            name,
            detail: format!("{value} is not a positive finite number"),
        })
    }
}

// ---------------------------------------------------------------------------
// AnalysisReport – result of analysing one record
// ---------------------------------------------------------------------------

/// Power, amplitude and spectral summary of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Mean of |x|².
    pub power: f64,
    /// Mean of |x|.
    pub amplitude: f64,
    /// Frequency (Hz, baseband) of the strongest FFT bin.
    pub main_frequency: f64,
    /// `10·log10(power / (variance + 1e-10))`, in dB.
    pub snr_estimate: f64,
    /// Magnitude of the strongest FFT bin.
    pub spectrum_peak: f64,
    pub data_length: usize,
}

impl AnalysisReport {
    /// `(key, value)` pairs in report order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("power", self.power),
            ("amplitude", self.amplitude),
            ("main_frequency", self.main_frequency),
            ("snr_estimate", self.snr_estimate),
            ("spectrum_peak", self.spectrum_peak),
            ("data_length", self.data_length as f64),
        ]
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "power: {}", self.power)?;
        writeln!(f, "amplitude: {}", self.amplitude)?;
        writeln!(f, "main_frequency: {}", self.main_frequency)?;
        writeln!(f, "snr_estimate: {}", self.snr_estimate)?;
        writeln!(f, "spectrum_peak: {}", self.spectrum_peak)?;
        writeln!(f, "data_length: {}", self.data_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejects_empty_samples() {
        let err = SignalRecord::new(Vec::new(), 2.4e6, 98.7e6, 0.0, Metadata::new()).unwrap_err();
        assert!(matches!(err, AcquisitionError::NonPositiveSampleCount { .. }));
    }

    #[test]
    fn test_record_rejects_bad_rate() {
        let samples = vec![Complex64::new(1.0, 0.0)];
        let err = SignalRecord::new(samples, -1.0, 98.7e6, 0.0, Metadata::new()).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::InvalidParameter { name: "sample_rate", .. }
        ));
    }

    #[test]
    fn test_record_rejects_non_finite_values() {
        let good = vec![Complex64::new(1.0, 0.0), Complex64::new(0.5, -0.5)];

        let mut samples = good.clone();
        samples[1].im = f64::NAN;
        let err = SignalRecord::new(samples, 2.4e6, 98.7e6, 0.0, Metadata::new()).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::InvalidParameter { name: "samples", .. }
        ));

        let err =
            SignalRecord::new(good.clone(), 2.4e6, 98.7e6, f64::INFINITY, Metadata::new())
                .unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::InvalidParameter { name: "timestamp", .. }
        ));

        let mut meta = Metadata::new();
        meta.insert("gain".into(), f64::INFINITY.into());
        let err = SignalRecord::new(good.clone(), 2.4e6, 98.7e6, 0.0, meta).unwrap_err();
        match err {
            AcquisitionError::InvalidParameter { name, detail } => {
                assert_eq!(name, "metadata");
                assert!(detail.contains("gain"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let mut meta = Metadata::new();
        meta.insert("gain".into(), 40.0.into());
        meta.insert("note".into(), MetadataValue::Null);
        assert!(SignalRecord::new(good, 2.4e6, 98.7e6, 0.0, meta).is_ok());
    }

    #[test]
    fn test_metadata_json_shape() {
        let mut meta = Metadata::new();
        meta.insert("device_id".into(), "rtl-sdr-01".into());
        meta.insert("duration".into(), 0.5.into());
        meta.insert("count".into(), MetadataValue::Integer(3));
        meta.insert("enabled".into(), true.into());
        meta.insert("note".into(), MetadataValue::Null);

        let text = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            text,
            r#"{"count":3,"device_id":"rtl-sdr-01","duration":0.5,"enabled":true,"note":null}"#
        );
        let back: Metadata = serde_json::from_str(&text).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_whole_float_stays_float() {
        let v: MetadataValue = serde_json::from_str(&serde_json::to_string(&MetadataValue::Float(1.0)).unwrap()).unwrap();
        assert_eq!(v, MetadataValue::Float(1.0));
    }

    #[test]
    fn test_report_display_order() {
        let report = AnalysisReport {
            power: 1.0,
            amplitude: 1.0,
            main_frequency: 0.0,
            snr_estimate: 100.0,
            spectrum_peak: 4.0,
            data_length: 4,
        };
        let text = report.to_string();
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(
            keys,
            ["power", "amplitude", "main_frequency", "snr_estimate", "spectrum_peak", "data_length"]
        );
    }
}
