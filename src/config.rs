//! Radio configuration store.
//!
//! JSON file layout:
//!
//! ```json
//! {
//!   "center_freq": 98700000.0,
//!   "sample_rate": 2400000.0,
//!   "gain": "auto",
//!   "device_id": "rtl-sdr-01",
//!   "bandwidth": 2400000.0,
//!   "antenna": "auto",
//!   "output_format": "complex64"
//! }
//! ```
//!
//! The first four keys are required; the rest fall back to defaults.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::data::model::MetadataValue;
use crate::error::ConfigError;

/// Keys that must be present in a config file.
pub const REQUIRED_KEYS: [&str; 4] = ["center_freq", "sample_rate", "gain", "device_id"];

// ---------------------------------------------------------------------------
// Gain
// ---------------------------------------------------------------------------

/// Receiver gain: a numeric setting in dB or a named mode such as `"auto"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gain {
    Db(f64),
    Mode(String),
}

impl Gain {
    pub fn auto() -> Self {
        Gain::Mode("auto".into())
    }

    /// Numeric text becomes `Db`, anything else a mode name.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(db) => Gain::Db(db),
            Err(_) => Gain::Mode(text.trim().to_string()),
        }
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gain::Db(db) => write!(f, "{db}"),
            Gain::Mode(mode) => write!(f, "{mode}"),
        }
    }
}

impl From<&Gain> for MetadataValue {
    fn from(gain: &Gain) -> Self {
        match gain {
            Gain::Db(db) => MetadataValue::Float(*db),
            Gain::Mode(mode) => MetadataValue::String(mode.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// RadioConfig
// ---------------------------------------------------------------------------

fn default_bandwidth() -> f64 {
    2.4e6
}

fn default_antenna() -> String {
    "auto".into()
}

fn default_output_format() -> String {
    "complex64".into()
}

/// Receiver parameters consumed by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Tuned frequency, Hz.
    pub center_freq: f64,
    /// Samples per second, Hz.
    pub sample_rate: f64,
    pub gain: Gain,
    pub device_id: String,
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
    #[serde(default = "default_antenna")]
    pub antenna: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            center_freq: 98.7e6,
            sample_rate: 2.4e6,
            gain: Gain::auto(),
            device_id: "rtl-sdr-01".into(),
            bandwidth: default_bandwidth(),
            antenna: default_antenna(),
            output_format: default_output_format(),
        }
    }
}

impl RadioConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        let config = Self::from_json(&text)?;
        log::info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Like [`RadioConfig::load`], but a missing file yields the defaults.
    /// Every other failure is returned.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound { .. }) => {
                log::warn!("config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let root: JsonValue = serde_json::from_str(text)?;
        let obj = root.as_object().ok_or_else(|| ConfigError::Invalid {
            field: "<root>",
            detail: "expected a JSON object".into(),
        })?;

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !obj.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let config: RadioConfig = serde_json::from_value(root)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate, then write pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| io_error(path, e))?;
        log::info!("config saved to {}", path.display());
        Ok(())
    }

    /// Frequencies and the sample rate must be positive finite numbers; a
    /// numeric gain must be finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("center_freq", self.center_freq),
            ("sample_rate", self.sample_rate),
            ("bandwidth", self.bandwidth),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    detail: format!("{value} is not a positive number"),
                });
            }
        }
        if let Gain::Db(db) = self.gain {
            if !db.is_finite() {
                return Err(ConfigError::Invalid {
                    field: "gain",
                    detail: format!("{db} dB is not finite"),
                });
            }
        }
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device_id",
                detail: "empty".into(),
            });
        }
        Ok(())
    }

    /// Apply a partial update. Nothing changes unless the result validates.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.center_freq {
            next.center_freq = v;
        }
        if let Some(v) = update.sample_rate {
            next.sample_rate = v;
        }
        if let Some(v) = update.gain {
            next.gain = v;
        }
        if let Some(v) = update.device_id {
            next.device_id = v;
        }
        if let Some(v) = update.bandwidth {
            next.bandwidth = v;
        }
        if let Some(v) = update.antenna {
            next.antenna = v;
        }
        if let Some(v) = update.output_format {
            next.output_format = v;
        }
        next.validate()?;
        if next != *self {
            log::info!("config updated: {next:?}");
        }
        *self = next;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ConfigError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ConfigError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigUpdate – typed partial update
// ---------------------------------------------------------------------------

/// One optional value per recognised field. Unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    pub center_freq: Option<f64>,
    pub sample_rate: Option<f64>,
    pub gain: Option<Gain>,
    pub device_id: Option<String>,
    pub bandwidth: Option<f64>,
    pub antenna: Option<String>,
    pub output_format: Option<String>,
}

impl ConfigUpdate {
    /// Parse `key=value` assignments (as given on the command line).
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut update = ConfigUpdate::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
                field: "update",
                detail: format!("'{pair}' is not of the form key=value"),
            })?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "center_freq" => update.center_freq = Some(parse_number("center_freq", value)?),
                "sample_rate" => update.sample_rate = Some(parse_number("sample_rate", value)?),
                "bandwidth" => update.bandwidth = Some(parse_number("bandwidth", value)?),
                "gain" => update.gain = Some(Gain::parse(value)),
                "device_id" => update.device_id = Some(value.to_string()),
                "antenna" => update.antenna = Some(value.to_string()),
                "output_format" => update.output_format = Some(value.to_string()),
                other => {
                    return Err(ConfigError::UnknownField {
                        field: other.to_string(),
                    })
                }
            }
        }
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::Invalid {
        field,
        detail: format!("'{value}' is not a number"),
    })
}
