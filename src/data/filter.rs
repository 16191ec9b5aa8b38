use super::iq_array::IqArray;
use crate::error::IqError;

// ---------------------------------------------------------------------------
// Threshold suppression on the I channel
// ---------------------------------------------------------------------------

/// Where the suppression threshold comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Threshold {
    /// Mean of the I column of the table being filtered.
    #[default]
    ChannelMean,
    Value(f64),
}

/// Filtered table plus what the filter did.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub data: IqArray,
    /// Threshold actually applied.
    pub threshold: f64,
    /// Number of I values that were zeroed.
    pub suppressed: usize,
}

/// Zero every I value strictly greater than the threshold.
///
/// Returns a new table; Q values, row count and the input are untouched.
/// A sample-rate annotation row is neither filtered nor counted.
pub fn threshold_filter(data: &IqArray, threshold: Threshold) -> Result<FilterOutcome, IqError> {
    if data.is_empty() {
        return Err(IqError::EmptyInput { operation: "filter" });
    }
    let threshold = match threshold {
        Threshold::ChannelMean => data.i_mean()?,
        Threshold::Value(v) => v,
    };

    let mut suppressed = 0;
    let filtered: Vec<f64> = data
        .data_rows()
        .iter()
        .map(|&[i, _]| {
            if i > threshold {
                suppressed += 1;
                0.0
            } else {
                i
            }
        })
        .collect();

    log::debug!(
        "filter: threshold={threshold:.6}, suppressed {suppressed}/{} I values",
        filtered.len()
    );

    Ok(FilterOutcome {
        data: data.with_i_column(filtered),
        threshold,
        suppressed,
    })
}
