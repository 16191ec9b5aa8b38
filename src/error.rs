use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// IQ table errors
// ---------------------------------------------------------------------------

/// Failures of the IQ table operations. Both are fatal to the calling
/// operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IqError {
    /// The input is not an `(n, 2)` table.
    #[error("{context}: expected (n,2) table, {detail}")]
    Shape { context: String, detail: String },

    /// Statistics or filtering over zero rows.
    #[error("{operation}: no samples to operate on")]
    EmptyInput { operation: &'static str },
}

impl IqError {
    pub(crate) fn shape(context: impl Into<String>, detail: impl Into<String>) -> Self {
        IqError::Shape {
            context: context.into(),
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Acquisition / analysis errors
// ---------------------------------------------------------------------------

/// Synthesis could not produce a record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("acquire: non-positive sample count ({sample_rate} Hz x {duration} s)")]
    NonPositiveSampleCount { sample_rate: f64, duration: f64 },

    #[error("acquire: invalid parameter `{name}`: {detail}")]
    InvalidParameter { name: &'static str, detail: String },

    #[error("acquire: sample source failed: {0}")]
    Source(String),
}

/// Analysis could not compute a meaningful result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("analyze: record holds no samples")]
    Empty,

    #[error("analyze: `{field}` is not finite")]
    NonFinite { field: &'static str },
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{}: not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: corrupt container: {detail}", .path.display())]
    Corrupt { path: PathBuf, detail: String },

    #[error("{}: I/O error: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: unsupported container extension", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error(transparent)]
    Shape(#[from] IqError),
}

impl PersistError {
    pub(crate) fn corrupt(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        PersistError::Corrupt {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            PersistError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            PersistError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: config file not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: I/O error: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config is missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("config field `{field}` is invalid: {detail}")]
    Invalid { field: &'static str, detail: String },

    #[error("unknown config field `{field}`")]
    UnknownField { field: String },
}
