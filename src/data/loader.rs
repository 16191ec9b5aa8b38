use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::iq_array::IqArray;
use super::model::{AnalysisReport, Metadata, SignalRecord};
use crate::error::{IqError, PersistError};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Container encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// `.parquet` / `.pq` – single-row Parquet file (recommended).
    Parquet,
    /// `.json` – the same five fields as a JSON object.
    Json,
}

impl ContainerFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "parquet" | "pq" => Some(ContainerFormat::Parquet),
            "json" => Some(ContainerFormat::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Parquet => "parquet",
            ContainerFormat::Json => "json",
        }
    }
}

/// Write a record to `path`, creating parent directories as needed.
pub fn save_record(record: &SignalRecord, path: &Path) -> Result<(), PersistError> {
    let format = ContainerFormat::from_path(path).ok_or_else(|| PersistError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    ensure_parent_dir(path)?;

    match format {
        ContainerFormat::Parquet => save_parquet(record, path)?,
        ContainerFormat::Json => save_json(record, path)?,
    }
    log::info!(
        "saved {} samples to {}",
        record.len(),
        path.display()
    );
    Ok(())
}

/// Read a record written by [`save_record`].
///
/// A missing file is `NotFound`; missing or malformed fields are `Corrupt`.
pub fn load_record(path: &Path) -> Result<SignalRecord, PersistError> {
    std::fs::metadata(path).map_err(|e| PersistError::io(path, e))?;
    let format = ContainerFormat::from_path(path).ok_or_else(|| PersistError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let record = match format {
        ContainerFormat::Parquet => load_parquet(path)?,
        ContainerFormat::Json => load_json(path)?,
    };
    log::info!("loaded {} samples from {}", record.len(), path.display());
    Ok(record)
}

/// Write a plain-text analysis report: record header, then one
/// `key: value` line per report field.
pub fn save_analysis_report(
    path: &Path,
    record: &SignalRecord,
    report: &AnalysisReport,
) -> Result<(), PersistError> {
    ensure_parent_dir(path)?;
    let text = format!(
        "=== Signal analysis ===\n\
         timestamp: {}\n\
         center_freq: {} Hz\n\
         sample_rate: {} Hz\n\
         data_length: {}\n\
         \n\
         {report}",
        record.timestamp() as u64,
        record.center_freq(),
        record.sample_rate(),
        record.len(),
    );
    std::fs::write(path, text).map_err(|e| PersistError::io(path, e))?;
    log::info!("analysis written to {}", path.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), PersistError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Shared validation for every decoded container.
fn build_record(
    path: &Path,
    samples: Vec<Complex64>,
    sample_rate: f64,
    center_freq: f64,
    timestamp: f64,
    metadata: Metadata,
) -> Result<SignalRecord, PersistError> {
    if samples.is_empty() {
        return Err(PersistError::corrupt(path, "'data' holds no samples"));
    }
    for (name, value) in [("sample_rate", sample_rate), ("center_freq", center_freq)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(PersistError::corrupt(
                path,
                format!("'{name}' = {value} is not a positive number"),
            ));
        }
    }
    if !timestamp.is_finite() {
        return Err(PersistError::corrupt(path, "'timestamp' is not finite"));
    }
    if let Some(idx) = samples
        .iter()
        .position(|s| !(s.re.is_finite() && s.im.is_finite()))
    {
        return Err(PersistError::corrupt(path, format!("sample {idx} is not finite")));
    }
    Ok(SignalRecord::from_parts(
        samples,
        sample_rate,
        center_freq,
        timestamp,
        metadata,
    ))
}

// ---------------------------------------------------------------------------
// JSON container
// ---------------------------------------------------------------------------

/// JSON layout:
///
/// ```json
/// {
///   "data": [[0.12, -0.03], [0.11, -0.02], ...],
///   "sample_rate": 2400000.0,
///   "center_freq": 98700000.0,
///   "timestamp": 1760866800.25,
///   "metadata": { "device_id": "rtl-sdr-01", "gain": "auto" }
/// }
/// ```
#[derive(Serialize, Deserialize)]
struct JsonContainer {
    data: Vec<[f64; 2]>,
    sample_rate: f64,
    center_freq: f64,
    timestamp: f64,
    metadata: Metadata,
}

fn save_json(record: &SignalRecord, path: &Path) -> Result<(), PersistError> {
    let container = JsonContainer {
        data: record.samples().iter().map(|s| [s.re, s.im]).collect(),
        sample_rate: record.sample_rate(),
        center_freq: record.center_freq(),
        timestamp: record.timestamp(),
        metadata: record.metadata().clone(),
    };
    let text = serde_json::to_string(&container).map_err(|e| PersistError::corrupt(path, e))?;
    std::fs::write(path, text).map_err(|e| PersistError::io(path, e))
}

fn load_json(path: &Path) -> Result<SignalRecord, PersistError> {
    let text = std::fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
    let container: JsonContainer =
        serde_json::from_str(&text).map_err(|e| PersistError::corrupt(path, e))?;

    let samples = container
        .data
        .iter()
        .map(|&[re, im]| Complex64::new(re, im))
        .collect();
    build_record(
        path,
        samples,
        container.sample_rate,
        container.center_freq,
        container.timestamp,
        container.metadata,
    )
}

// ---------------------------------------------------------------------------
// Parquet container
// ---------------------------------------------------------------------------

/// Parquet schema, one row per file:
/// - `data_i`, `data_q`: List<Float64> – sample columns
/// - `sample_rate`, `center_freq`, `timestamp`: Float64
/// - `metadata`: Utf8 – JSON object of scalars
fn container_schema() -> Arc<Schema> {
    let list = || DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    Arc::new(Schema::new(vec![
        Field::new("data_i", list(), false),
        Field::new("data_q", list(), false),
        Field::new("sample_rate", DataType::Float64, false),
        Field::new("center_freq", DataType::Float64, false),
        Field::new("timestamp", DataType::Float64, false),
        Field::new("metadata", DataType::Utf8, false),
    ]))
}

fn f64_list(values: impl Iterator<Item = f64>, len: usize) -> ListArray {
    let mut builder = ListBuilder::new(Float64Builder::with_capacity(len));
    for v in values {
        builder.values().append_value(v);
    }
    builder.append(true);
    builder.finish()
}

fn save_parquet(record: &SignalRecord, path: &Path) -> Result<(), PersistError> {
    let n = record.len();
    let samples = record.samples();
    let metadata_json =
        serde_json::to_string(record.metadata()).map_err(|e| PersistError::corrupt(path, e))?;

    let schema = container_schema();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(f64_list(samples.iter().map(|s| s.re), n)),
        Arc::new(f64_list(samples.iter().map(|s| s.im), n)),
        Arc::new(Float64Array::from(vec![record.sample_rate()])),
        Arc::new(Float64Array::from(vec![record.center_freq()])),
        Arc::new(Float64Array::from(vec![record.timestamp()])),
        Arc::new(StringArray::from(vec![metadata_json.as_str()])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| PersistError::io(path, std::io::Error::other(e)))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = std::fs::File::create(path).map_err(|e| PersistError::io(path, e))?;
    let write_err = |e: parquet::errors::ParquetError| PersistError::io(path, std::io::Error::other(e));
    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(write_err)?;
    writer.write(&batch).map_err(write_err)?;
    writer.close().map_err(write_err)?;
    Ok(())
}

fn load_parquet(path: &Path) -> Result<SignalRecord, PersistError> {
    let file = std::fs::File::open(path).map_err(|e| PersistError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| PersistError::corrupt(path, format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| PersistError::corrupt(path, format!("building parquet reader: {e}")))?;

    let mut first: Option<RecordBatch> = None;
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| PersistError::corrupt(path, format!("reading record batch: {e}")))?;
        if batch.num_rows() > 0 {
            first = Some(batch);
            break;
        }
    }
    let batch = first.ok_or_else(|| PersistError::corrupt(path, "container holds no rows"))?;

    let data_i = extract_f64_list(path, &batch, "data_i")?;
    let data_q = extract_f64_list(path, &batch, "data_q")?;
    if data_i.len() != data_q.len() {
        return Err(PersistError::corrupt(
            path,
            format!("data_i has {} values but data_q has {}", data_i.len(), data_q.len()),
        ));
    }
    let samples = data_i
        .into_iter()
        .zip(data_q)
        .map(|(re, im)| Complex64::new(re, im))
        .collect();

    let metadata_json = extract_str(path, &batch, "metadata")?;
    let metadata: Metadata = serde_json::from_str(&metadata_json)
        .map_err(|e| PersistError::corrupt(path, format!("'metadata': {e}")))?;

    build_record(
        path,
        samples,
        extract_f64(path, &batch, "sample_rate")?,
        extract_f64(path, &batch, "center_freq")?,
        extract_f64(path, &batch, "timestamp")?,
        metadata,
    )
}

// -- Parquet / Arrow helpers --

fn column<'a>(path: &Path, batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, PersistError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| PersistError::corrupt(path, format!("missing '{name}' column")))?;
    if col.is_null(0) {
        return Err(PersistError::corrupt(path, format!("'{name}' is null")));
    }
    Ok(col)
}

/// Extract the `Vec<f64>` held by a List column in the first row.
fn extract_f64_list(path: &Path, batch: &RecordBatch, name: &str) -> Result<Vec<f64>, PersistError> {
    let col = column(path, batch, name)?;
    let list = col
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| {
            PersistError::corrupt(path, format!("'{name}' is {:?}, expected List", col.data_type()))
        })?;
    let values = list.value(0);
    let floats = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            PersistError::corrupt(
                path,
                format!("'{name}' items are {:?}, expected Float64", values.data_type()),
            )
        })?;
    if floats.null_count() > 0 {
        return Err(PersistError::corrupt(path, format!("'{name}' contains nulls")));
    }
    Ok(floats.values().to_vec())
}

fn extract_f64(path: &Path, batch: &RecordBatch, name: &str) -> Result<f64, PersistError> {
    let col = column(path, batch, name)?;
    col.as_any()
        .downcast_ref::<Float64Array>()
        .map(|arr| arr.value(0))
        .ok_or_else(|| {
            PersistError::corrupt(path, format!("'{name}' is {:?}, expected Float64", col.data_type()))
        })
}

fn extract_str(path: &Path, batch: &RecordBatch, name: &str) -> Result<String, PersistError> {
    let col = column(path, batch, name)?;
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(0).to_string())
        .ok_or_else(|| {
            PersistError::corrupt(path, format!("'{name}' is {:?}, expected Utf8", col.data_type()))
        })
}

// ---------------------------------------------------------------------------
// IQ table CSV import / export
// ---------------------------------------------------------------------------

/// Write a table as CSV with an `i,q` header. Annotation rows are written
/// as ordinary rows.
pub fn save_iq_csv(table: &IqArray, path: &Path) -> Result<(), PersistError> {
    ensure_parent_dir(path)?;
    let csv_err = |e: csv::Error| PersistError::io(path, std::io::Error::other(e));
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(["i", "q"]).map_err(csv_err)?;
    for &[i, q] in table.rows() {
        writer
            .serialize((i, q))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| PersistError::io(path, e))?;
    Ok(())
}

/// Read an `i,q` CSV table.
///
/// Rows with a field count other than two, or non-numeric fields, are shape
/// errors. The imported table's trailing row is treated by the `Q == 0`
/// annotation rule.
pub fn load_iq_csv(path: &Path) -> Result<IqArray, PersistError> {
    std::fs::metadata(path).map_err(|e| PersistError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PersistError::corrupt(path, format!("opening CSV: {e}")))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PersistError::corrupt(path, format!("CSV row {row_no}: {e}")))?;
        if record.len() != 2 {
            return Err(IqError::shape(
                format!("{}", path.display()),
                format!("row {row_no} has {} elements", record.len()),
            )
            .into());
        }
        let mut pair = [0.0; 2];
        for (col, field) in record.iter().enumerate() {
            pair[col] = field.trim().parse::<f64>().map_err(|_| {
                IqError::shape(
                    format!("{}", path.display()),
                    format!("row {row_no}, column {col}: '{field}' is not a number"),
                )
            })?;
        }
        rows.push(pair);
    }
    Ok(IqArray::from_imported(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MetadataValue;
    use tempfile::TempDir;

    fn sample_record() -> SignalRecord {
        let samples: Vec<Complex64> = (0..64)
            .map(|k| Complex64::new((k as f64 * 0.3).cos() * 0.7, (k as f64 * 0.3).sin() * -0.2))
            .collect();
        let mut metadata = Metadata::new();
        metadata.insert("device_id".into(), "rtl-sdr-01".into());
        metadata.insert("gain".into(), "auto".into());
        metadata.insert("duration".into(), MetadataValue::Float(0.1));
        metadata.insert("data_type".into(), "complex64".into());
        SignalRecord::new(samples, 2.4e6, 98.7e6, 1_760_866_800.123_456, metadata).unwrap()
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/signal.parquet");
        let record = sample_record();
        save_record(&record, &path).unwrap();
        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signal.json");
        let record = sample_record();
        save_record(&record, &path).unwrap();
        assert_eq!(load_record(&path).unwrap(), record);
    }

    #[test]
    fn test_metadata_floats_round_trip() {
        let dir = TempDir::new().unwrap();
        let record = sample_record();
        let mut metadata = record.metadata().clone();
        metadata.insert("gain".into(), MetadataValue::Float(-12.5));
        metadata.insert("tiny".into(), MetadataValue::Float(f64::MIN_POSITIVE));
        metadata.insert("note".into(), MetadataValue::Null);
        let record = SignalRecord::new(
            record.samples().to_vec(),
            record.sample_rate(),
            record.center_freq(),
            record.timestamp(),
            metadata,
        )
        .unwrap();

        for name in ["signal.parquet", "signal.json"] {
            let path = dir.path().join(name);
            save_record(&record, &path).unwrap();
            assert_eq!(load_record(&path).unwrap(), record, "{name}");
        }
    }

    #[test]
    fn test_non_finite_samples_are_corrupt_on_load() {
        let dir = TempDir::new().unwrap();
        let mut samples = sample_record().samples().to_vec();
        samples[3].re = f64::NAN;
        let bad = SignalRecord::from_parts(samples, 2.4e6, 98.7e6, 0.0, Metadata::new());

        let path = dir.path().join("nan.parquet");
        save_record(&bad, &path).unwrap();
        match load_record(&path).unwrap_err() {
            PersistError::Corrupt { detail, .. } => assert!(detail.contains("sample 3")),
            other => panic!("unexpected error {other}"),
        }

        let path = dir.path().join("nan.json");
        save_record(&bad, &path).unwrap();
        assert!(matches!(load_record(&path), Err(PersistError::Corrupt { .. })));
    }

    #[test]
    fn test_analysis_report_file() {
        let dir = TempDir::new().unwrap();
        let record = sample_record();
        let report = AnalysisReport {
            power: 0.25,
            amplitude: 0.5,
            main_frequency: -1200.0,
            snr_estimate: 3.5,
            spectrum_peak: 16.0,
            data_length: record.len(),
        };
        let path = dir.path().join("reports/analysis_1760866800.txt");
        save_analysis_report(&path, &record, &report).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== Signal analysis ===");
        assert_eq!(lines[1], "timestamp: 1760866800");
        assert_eq!(lines[2], "center_freq: 98700000 Hz");
        assert_eq!(lines[3], "sample_rate: 2400000 Hz");
        assert_eq!(lines[4], "data_length: 64");
        assert_eq!(lines[5], "");
        assert_eq!(
            &lines[6..],
            &[
                "power: 0.25",
                "amplitude: 0.5",
                "main_frequency: -1200",
                "snr_estimate: 3.5",
                "spectrum_peak: 16",
                "data_length: 64",
            ]
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        for name in ["absent.parquet", "absent.json", "absent.bin"] {
            let err = load_record(&dir.path().join(name)).unwrap_err();
            assert!(matches!(err, PersistError::NotFound { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let err = save_record(&sample_record(), &dir.path().join("signal.npz")).unwrap_err();
        assert!(matches!(err, PersistError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_corrupt_json_missing_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"data": [[1.0, 2.0]], "sample_rate": 1.0}"#).unwrap();
        let err = load_record(&path).unwrap_err();
        match err {
            PersistError::Corrupt { detail, .. } => assert!(detail.contains("center_freq")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_corrupt_json_empty_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(
            &path,
            r#"{"data": [], "sample_rate": 1.0, "center_freq": 2.0, "timestamp": 0.0, "metadata": {}}"#,
        )
        .unwrap();
        assert!(matches!(load_record(&path), Err(PersistError::Corrupt { .. })));
    }

    #[test]
    fn test_garbage_parquet_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.parquet");
        std::fs::write(&path, b"definitely not parquet").unwrap();
        assert!(matches!(load_record(&path), Err(PersistError::Corrupt { .. })));
    }

    #[test]
    fn test_parquet_missing_column_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new("sample_rate", DataType::Float64, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        match load_record(&path).unwrap_err() {
            PersistError::Corrupt { detail, .. } => assert!(detail.contains("data_i")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_csv_round_trip_keeps_annotation_heuristic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let table = IqArray::from_rows(&[[1.0, 2.0], [3.0, 4.0]], Some(2.4e6)).unwrap();
        save_iq_csv(&table, &path).unwrap();

        let loaded = load_iq_csv(&path).unwrap();
        assert_eq!(loaded.rows(), table.rows());
        let split = loaded.split_annotation();
        assert_eq!(split.sample_rate, Some(2.4e6));
        assert_eq!(split.data.rows(), &[[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_csv_wrong_width_is_shape_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.csv");
        std::fs::write(&path, "i,q\n1,2\n3,4,5\n").unwrap();
        assert!(matches!(
            load_iq_csv(&path),
            Err(PersistError::Shape(IqError::Shape { .. }))
        ));

        std::fs::write(&path, "i,q\n1,abc\n").unwrap();
        assert!(matches!(
            load_iq_csv(&path),
            Err(PersistError::Shape(IqError::Shape { .. }))
        ));
    }
}
