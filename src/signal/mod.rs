/// Signal layer: sample sources, preprocessing, analysis and the
/// continuous acquisition loop.
///
/// ```text
///   SampleSource ──► preprocess (normalise, smooth) ──► SignalRecord
///                                                          │
///                                  analyzer::analyze ◄─────┤
///                                                          ▼
///                                                  data::loader (persist)
/// ```

pub mod acquisition;
pub mod analyzer;
pub mod preprocess;
pub mod source;
