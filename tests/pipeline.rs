use approx::assert_relative_eq;
use tempfile::TempDir;

use iq_toolkit::signal::source::{GaussianNoise, NoisyTone};
use iq_toolkit::{
    analyze, load_record, save_record, threshold_filter, AnalysisReport, IqArray, PersistError,
    RadioConfig, SignalAnalyzer, Threshold,
};

fn assert_reports_match(a: &AnalysisReport, b: &AnalysisReport) {
    assert_relative_eq!(a.power, b.power, max_relative = 1e-9);
    assert_relative_eq!(a.amplitude, b.amplitude, max_relative = 1e-9);
    assert_relative_eq!(a.main_frequency, b.main_frequency, epsilon = 1e-6);
    assert_relative_eq!(a.snr_estimate, b.snr_estimate, max_relative = 1e-9);
    assert_relative_eq!(a.spectrum_peak, b.spectrum_peak, max_relative = 1e-9);
    assert_eq!(a.data_length, b.data_length);
}

#[test]
fn acquire_persist_load_analyze() {
    let dir = TempDir::new().unwrap();
    let mut analyzer = SignalAnalyzer::new(RadioConfig::default())
        .with_source(GaussianNoise::new(0.0, 0.1, Some(42)));

    let record = analyzer.synthesize(2.4e6, 98.7e6, 0.1).unwrap();
    assert_eq!(record.len(), 240_000);
    let report = analyze(&record).unwrap();
    assert!(report.power >= 0.0);
    assert_eq!(report.data_length, 240_000);

    for name in ["signal.parquet", "signal.json"] {
        let path = dir.path().join("out").join(name);
        save_record(&record, &path).unwrap();
        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded.metadata(), record.metadata());
        assert_eq!(loaded.timestamp(), record.timestamp());
        assert_reports_match(&analyze(&loaded).unwrap(), &report);
    }
}

#[test]
fn tone_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = RadioConfig {
        sample_rate: 1.0e6,
        ..RadioConfig::default()
    };
    // 0.005 cycles/sample → 5 kHz, inside the 100-tap smoother's main lobe
    let mut analyzer =
        SignalAnalyzer::new(config).with_source(NoisyTone::new(0.005, 0.01, Some(42)));
    let record = analyzer.acquire(0.01).unwrap();
    let report = analyze(&record).unwrap();
    assert_relative_eq!(report.main_frequency, 5_000.0, epsilon = 1e-6);

    let path = dir.path().join("tone.parquet");
    save_record(&record, &path).unwrap();
    assert_reports_match(&analyze(&load_record(&path).unwrap()).unwrap(), &report);
}

#[test]
fn missing_container_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = load_record(&dir.path().join("missing/signal.parquet")).unwrap_err();
    assert!(matches!(err, PersistError::NotFound { .. }));
}

#[test]
fn annotate_split_filter() {
    let table = IqArray::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], Some(2.4e6)).unwrap();
    assert_eq!(table.shape(), (4, 2));
    assert_eq!(table.rows()[3], [2.4e6, 0.0]);

    let split = table.split_annotation();
    assert!(split.annotation_present());
    let stats = split.data.statistics().unwrap();
    assert_relative_eq!(stats.i_mean, 3.0);
    assert_relative_eq!(stats.i_min, 1.0);
    assert_relative_eq!(stats.i_max, 5.0);

    let filtered = threshold_filter(&split.data, Threshold::ChannelMean).unwrap();
    assert_eq!(filtered.data.shape(), (3, 2));
    assert!(filtered.data.i_column().iter().all(|&i| i <= 3.0));

    let sliced = split.data.head(10);
    assert_eq!(sliced.rows(), split.data.rows());
}
