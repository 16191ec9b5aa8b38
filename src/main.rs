//! Radio data acquisition front end.
//!
//! Synthesises IQ records from the configured (simulated) receiver, stores
//! them and optionally analyses them.
//!
//! ```bash
//! # one second, analysed, written under ./data
//! iq-toolkit -c radio_config.json -d 1.0 -a
//!
//! # one record every 5 s until Ctrl-C, retuned on the command line
//! iq-toolkit --continuous -i 5 --set center_freq=101.1e6
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use iq_toolkit::signal::acquisition::{
    analysis_file_name, single_file_name, ContinuousAcquisition,
};
use iq_toolkit::signal::source::{GaussianNoise, DEFAULT_NOISE_STD};
use iq_toolkit::{
    analyze, save_analysis_report, save_record, ConfigUpdate, ContainerFormat, RadioConfig,
    SignalAnalyzer,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Parquet,
    Json,
}

impl From<Format> for ContainerFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Parquet => ContainerFormat::Parquet,
            Format::Json => ContainerFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "iq-toolkit", version, about = "Radio data acquisition (synthetic IQ source)")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "radio_config.json")]
    config: PathBuf,

    /// Acquisition length in seconds
    #[arg(short, long, default_value_t = 1.0)]
    duration: f64,

    /// Output directory
    #[arg(short, long, default_value = "data")]
    output: PathBuf,

    /// Analyse the acquired signal
    #[arg(short, long)]
    analyze: bool,

    /// Acquire repeatedly until interrupted
    #[arg(long)]
    continuous: bool,

    /// Seconds between continuous acquisitions
    #[arg(short, long, default_value_t = 5.0)]
    interval: f64,

    /// Stop continuous mode after this many acquisitions
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Override a config field (repeatable), e.g. --set gain=30
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Write the effective config back to --config
    #[arg(long)]
    save_config: bool,

    /// Container format for stored records
    #[arg(long, value_enum, default_value_t = Format::Parquet)]
    format: Format,

    /// Keep the last N records in memory and summarise them at the end
    #[arg(long)]
    history: Option<usize>,

    /// Seed for the noise generator
    #[arg(long)]
    seed: Option<u64>,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("creating log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_deref())?;

    let interval = Duration::try_from_secs_f64(args.interval)
        .context("--interval must be a non-negative number of seconds")?;

    let mut config = RadioConfig::load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if !args.overrides.is_empty() {
        let update = ConfigUpdate::from_pairs(&args.overrides).context("parsing --set")?;
        config.apply(update).context("applying --set")?;
    }
    if args.save_config {
        config
            .save(&args.config)
            .with_context(|| format!("saving config {}", args.config.display()))?;
    }

    log::info!("=== radio data acquisition ===");
    log::info!("config file: {}", args.config.display());
    log::info!("center frequency: {} Hz", config.center_freq);
    log::info!("sample rate: {} Hz", config.sample_rate);
    log::info!("device: {}", config.device_id);

    let mut analyzer = SignalAnalyzer::new(config)
        .with_source(GaussianNoise::new(0.0, DEFAULT_NOISE_STD, args.seed));
    if let Some(capacity) = args.history {
        analyzer = analyzer.with_history(capacity);
    }

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    if args.continuous {
        run_continuous(&args, interval, &mut analyzer)
    } else {
        run_single(&args, &mut analyzer)
    }
}

fn run_single(args: &Args, analyzer: &mut SignalAnalyzer) -> Result<()> {
    log::info!("single acquisition, {} s", args.duration);
    let record = analyzer.acquire(args.duration).context("acquisition failed")?;

    let path = args
        .output
        .join(single_file_name(record.timestamp(), args.format.into()));
    save_record(&record, &path).context("saving signal record")?;

    if args.analyze {
        match analyze(&record) {
            Ok(report) => {
                log::info!("=== analysis ===");
                for (key, value) in report.entries() {
                    log::info!("{key}: {value}");
                }
                let report_path = args.output.join(analysis_file_name(record.timestamp()));
                save_analysis_report(&report_path, &record, &report)
                    .context("writing analysis report")?;
            }
            Err(e) => log::error!("{e}"),
        }
    }
    Ok(())
}

fn run_continuous(args: &Args, interval: Duration, analyzer: &mut SignalAnalyzer) -> Result<()> {
    let mut acquisition = ContinuousAcquisition::new(&args.output, args.duration, interval)
        .with_format(args.format.into());
    if let Some(n) = args.max_iterations {
        acquisition = acquisition.with_max_iterations(n);
    }

    let handle = acquisition.stop_handle();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping after the current acquisition");
        handle.stop();
    })
    .context("installing Ctrl-C handler")?;

    let summary = acquisition.run(analyzer);
    println!(
        "{} acquisitions, {} saved, {} failed",
        summary.iterations,
        summary.saved.len(),
        summary.failures
    );

    for record in analyzer.history() {
        match analyze(record) {
            Ok(report) => log::info!(
                "recent @{:.0}: power {:.6}, main frequency {:.2} Hz, snr {:.2} dB",
                record.timestamp(),
                report.power,
                report.main_frequency,
                report.snr_estimate
            ),
            Err(e) => log::warn!("recent @{:.0}: {e}", record.timestamp()),
        }
    }
    Ok(())
}
