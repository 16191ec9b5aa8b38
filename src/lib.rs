//! Toolkit for synthetic IQ sample data: IQ table manipulation, signal
//! synthesis, spectral analysis and record persistence.

pub mod config;
pub mod data;
pub mod error;
pub mod signal;

pub use config::{ConfigUpdate, Gain, RadioConfig};
pub use data::filter::{threshold_filter, FilterOutcome, Threshold};
pub use data::iq_array::{Annotation, AnnotationSplit, IqArray, IqStatistics};
pub use data::loader::{load_record, save_analysis_report, save_record, ContainerFormat};
pub use data::model::{AnalysisReport, Metadata, MetadataValue, SignalRecord};
pub use error::{AcquisitionError, AnalysisError, ConfigError, IqError, PersistError};
pub use signal::analyzer::{analyze, SignalAnalyzer};
