//! Continuous acquisition: synthesise → persist → sleep, until stopped.
//!
//! Stopping is cooperative. A stop request is observed between iterations
//! and while sleeping, never in the middle of a synthesis.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::analyzer::SignalAnalyzer;
use crate::data::loader::{save_record, ContainerFormat};

/// Granularity at which the inter-acquisition sleep checks the stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Cloneable handle that requests the loop to stop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// File name for the `index`-th continuous acquisition.
pub fn continuous_file_name(index: usize, timestamp: f64, format: ContainerFormat) -> String {
    format!(
        "continuous_{index:04}_{}.{}",
        timestamp as u64,
        format.extension()
    )
}

/// File name for a single-shot acquisition.
pub fn single_file_name(timestamp: f64, format: ContainerFormat) -> String {
    format!("signal_{}.{}", timestamp as u64, format.extension())
}

/// File name for the analysis report of the record taken at `timestamp`.
pub fn analysis_file_name(timestamp: f64) -> String {
    format!("analysis_{}.txt", timestamp as u64)
}

/// What a finished loop did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionSummary {
    pub iterations: usize,
    pub saved: Vec<PathBuf>,
    pub failures: usize,
}

/// Settings and run flag for a continuous acquisition loop.
pub struct ContinuousAcquisition {
    output_dir: PathBuf,
    duration: f64,
    interval: Duration,
    format: ContainerFormat,
    max_iterations: Option<usize>,
    running: Arc<AtomicBool>,
}

impl ContinuousAcquisition {
    pub fn new(output_dir: impl Into<PathBuf>, duration: f64, interval: Duration) -> Self {
        Self {
            output_dir: output_dir.into(),
            duration,
            interval,
            format: ContainerFormat::Parquet,
            max_iterations: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_format(mut self, format: ContainerFormat) -> Self {
        self.format = format;
        self
    }

    /// Stop on its own after `n` iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run until stopped or the iteration limit is reached.
    ///
    /// A stop requested before `run` is honoured: the loop does no work.
    /// Failed acquisitions and failed writes are logged and counted; the loop
    /// carries on with the next iteration.
    pub fn run(&self, analyzer: &mut SignalAnalyzer) -> AcquisitionSummary {
        log::info!(
            "continuous acquisition started, output {}, interval {:?}",
            self.output_dir.display(),
            self.interval
        );

        let mut summary = AcquisitionSummary::default();
        while self.running.load(Ordering::SeqCst) {
            if self.max_iterations.is_some_and(|max| summary.iterations >= max) {
                break;
            }
            summary.iterations += 1;
            let index = summary.iterations;
            log::info!("acquisition #{index}");

            match analyzer.acquire(self.duration) {
                Ok(record) => {
                    let path = self
                        .output_dir
                        .join(continuous_file_name(index, record.timestamp(), self.format));
                    match save_record(&record, &path) {
                        Ok(()) => summary.saved.push(path),
                        Err(e) => {
                            log::error!("acquisition #{index}: {e}");
                            summary.failures += 1;
                        }
                    }
                }
                Err(e) => {
                    log::error!("acquisition #{index}: {e}");
                    summary.failures += 1;
                }
            }

            if self.max_iterations.is_some_and(|max| summary.iterations >= max) {
                break;
            }
            self.sleep_interval();
        }

        self.running.store(false, Ordering::SeqCst);
        log::info!(
            "continuous acquisition stopped after {} iterations ({} saved, {} failed)",
            summary.iterations,
            summary.saved.len(),
            summary.failures
        );
        summary
    }

    fn sleep_interval(&self) {
        let deadline = Instant::now() + self.interval;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(STOP_POLL.min(deadline - now));
        }
    }
}
