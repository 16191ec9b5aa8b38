//! Step-by-step IQ table walkthrough: build a table from a noisy tone,
//! inspect it, slice it, filter it and attach the configured sample rate.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use iq_toolkit::data::loader::save_iq_csv;
use iq_toolkit::signal::source::{NoisyTone, SampleSource};
use iq_toolkit::{threshold_filter, IqArray, RadioConfig, Threshold};

#[derive(Parser, Debug)]
#[command(name = "iq-walkthrough", about = "Basic IQ table operations on a synthetic tone")]
struct Args {
    /// Config file providing the sample rate annotation
    #[arg(short, long, default_value = "radio_config.json")]
    config: PathBuf,

    /// Number of IQ pairs to generate
    #[arg(short = 'n', long, default_value_t = 1000)]
    samples: usize,

    /// Rows to keep in the slicing step
    #[arg(long, default_value_t = 200)]
    head: usize,

    /// Export the annotated table to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn rule(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(60));
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // ---- 1. data preparation ----
    rule("[1] data preparation");
    // 0.1 cycles/sample tone with 0.1 noise, seed 42
    let mut tone = NoisyTone::new(0.1, 0.1, Some(42));
    let pairs: Vec<[f64; 2]> = tone
        .generate(args.samples)?
        .iter()
        .map(|s| [s.re, s.im])
        .collect();
    let table = IqArray::from_rows(&pairs, None)?;
    println!("table from generated pairs: shape {:?}", table.shape());
    println!("zero-filled default table:  shape {:?}", IqArray::default().shape());

    // ---- 2. basic operations ----
    rule("[2] basic operations");
    let (rows, cols) = table.shape();
    println!("shape: ({rows}, {cols}), size: {}, ndim: 2", rows * cols);

    let head = table.head(args.head);
    println!("first {} rows: shape {:?}", args.head, head.shape());
    print!("{}", head.head(5));

    let q: Vec<String> = table.q_column().iter().take(10).map(|v| format!("{v:.4}")).collect();
    println!("Q column (first 10): [{}]", q.join(", "));

    let stats = table.statistics()?;
    println!(
        "I: mean {:.6}, std {:.6}, min {:.6}, max {:.6}",
        stats.i_mean, stats.i_std, stats.i_min, stats.i_max
    );
    println!("Q: mean {:.6}, std {:.6}", stats.q_mean, stats.q_std);

    let filtered = threshold_filter(&table, Threshold::ChannelMean)?;
    println!(
        "filter: {} I values above {:.6} set to 0, filtered I mean {:.6}",
        filtered.suppressed,
        filtered.threshold,
        filtered.data.i_mean()?
    );
    let before: Vec<String> = table.i_column().iter().take(10).map(|v| format!("{v:.4}")).collect();
    let after: Vec<String> = filtered
        .data
        .i_column()
        .iter()
        .take(10)
        .map(|v| format!("{v:.4}"))
        .collect();
    println!("  before: [{}]", before.join(", "));
    println!("  after:  [{}]", after.join(", "));

    // ---- 3. sample rate annotation ----
    rule("[3] sample rate annotation");
    let config = RadioConfig::load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let annotated = IqArray::from_rows(filtered.data.rows(), Some(config.sample_rate))?;
    println!("annotated table: shape {:?}", annotated.shape());
    if let Some(last) = annotated.rows().last() {
        println!("last row: [{:.3e}, {}]", last[0], last[1]);
    }

    let split = annotated.split_annotation();
    println!("data rows after split: {:?}", split.data.shape());
    match split.sample_rate {
        Some(rate) => println!("sample rate annotation: {rate:.2e} Hz"),
        None => println!("no sample rate annotation"),
    }

    if let Some(path) = &args.export {
        save_iq_csv(&annotated, path)?;
        println!("\nannotated table written to {}", path.display());
    }
    Ok(())
}
