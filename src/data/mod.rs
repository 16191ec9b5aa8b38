/// Data layer: IQ tables, signal records, filtering and persistence.
///
/// Architecture:
/// ```text
///   [[I, Q], ...] / .csv
///        │
///        ▼
///   ┌──────────┐
///   │ IqArray  │  (n, 2) table, annotation row, slicing, statistics
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  threshold suppression on the I column → new IqArray
///   └──────────┘
///
///   SignalRecord ◄──► loader ◄──► .parquet / .json
/// ```

pub mod filter;
pub mod iq_array;
pub mod loader;
pub mod model;
