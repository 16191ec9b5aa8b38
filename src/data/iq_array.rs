use std::fmt;

use rustfft::num_complex::Complex64;

use crate::error::IqError;

/// Row count of a table created without samples.
pub const DEFAULT_LEN: usize = 1000;

/// Require a two-dimensional shape with exactly two columns.
pub fn validate_shape(shape: &[usize]) -> Result<(), IqError> {
    match shape {
        [_, 2] => Ok(()),
        [_, cols] => Err(IqError::shape(
            "validate_shape",
            format!("got {cols} columns"),
        )),
        other => Err(IqError::shape(
            "validate_shape",
            format!("got {} dimensions {other:?}", other.len()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Annotation – what we know about the trailing sample-rate row
// ---------------------------------------------------------------------------

/// Provenance of the optional trailing `[sample_rate, 0]` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Annotation {
    /// Built without a sample rate; the last row is always data.
    Absent,
    /// Built with a sample rate; the last row is the annotation.
    Present(f64),
    /// Imported from outside; fall back to the `Q == 0` heuristic.
    Unknown,
}

/// Result of [`IqArray::split_annotation`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSplit {
    pub data: IqArray,
    /// Sample rate read from the annotation row, if one was split off.
    pub sample_rate: Option<f64>,
}

impl AnnotationSplit {
    pub fn annotation_present(&self) -> bool {
        self.sample_rate.is_some()
    }
}

// ---------------------------------------------------------------------------
// IqStatistics
// ---------------------------------------------------------------------------

/// Population statistics of the I and Q columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqStatistics {
    pub i_mean: f64,
    pub i_std: f64,
    pub q_mean: f64,
    pub q_std: f64,
    pub i_min: f64,
    pub i_max: f64,
    pub q_min: f64,
    pub q_max: f64,
}

// ---------------------------------------------------------------------------
// IqArray – the (n, 2) table
// ---------------------------------------------------------------------------

/// Ordered `(n, 2)` table of in-phase / quadrature values.
///
/// The column count is fixed by the row type, so every constructed value
/// satisfies the shape invariant. Operations return new tables.
#[derive(Debug, Clone, PartialEq)]
pub struct IqArray {
    rows: Vec<[f64; 2]>,
    annotation: Annotation,
}

impl Default for IqArray {
    /// Zero-filled table of [`DEFAULT_LEN`] rows.
    fn default() -> Self {
        Self::zeros(DEFAULT_LEN)
    }
}

impl IqArray {
    pub fn zeros(len: usize) -> Self {
        Self {
            rows: vec![[0.0; 2]; len],
            annotation: Annotation::Absent,
        }
    }

    /// Build a table from `[I, Q]` rows, optionally appending the
    /// `[sample_rate, 0]` annotation row.
    ///
    /// Every row must hold exactly two values; anything else is a shape error
    /// naming the offending row.
    pub fn from_rows<R: AsRef<[f64]>>(
        rows: &[R],
        sample_rate: Option<f64>,
    ) -> Result<Self, IqError> {
        let mut table = Vec::with_capacity(rows.len() + usize::from(sample_rate.is_some()));
        for (idx, row) in rows.iter().enumerate() {
            match row.as_ref() {
                [i, q] => table.push([*i, *q]),
                other => {
                    return Err(IqError::shape(
                        "construct",
                        format!("row {idx} has {} elements", other.len()),
                    ))
                }
            }
        }
        Ok(Self::with_annotation(table, sample_rate))
    }

    /// Build a table from a flat row-major buffer with an explicit shape.
    pub fn from_flat(values: &[f64], shape: &[usize]) -> Result<Self, IqError> {
        validate_shape(shape)?;
        let needed = shape[0]
            .checked_mul(2)
            .ok_or_else(|| IqError::shape("from_flat", format!("shape {shape:?} is too large")))?;
        if values.len() != needed {
            return Err(IqError::shape(
                "from_flat",
                format!("shape {shape:?} needs {needed} values, got {}", values.len()),
            ));
        }
        let rows = values.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
        Ok(Self {
            rows,
            annotation: Annotation::Unknown,
        })
    }

    /// Table whose annotation provenance is unknown (CSV import and the like).
    pub(crate) fn from_imported(rows: Vec<[f64; 2]>) -> Self {
        Self {
            rows,
            annotation: Annotation::Unknown,
        }
    }

    /// Two-column view of complex samples.
    pub fn from_complex(samples: &[Complex64], sample_rate: Option<f64>) -> Self {
        let rows = samples.iter().map(|s| [s.re, s.im]).collect();
        Self::with_annotation(rows, sample_rate)
    }

    fn with_annotation(mut rows: Vec<[f64; 2]>, sample_rate: Option<f64>) -> Self {
        let annotation = match sample_rate {
            Some(rate) => {
                rows.push([rate, 0.0]);
                Annotation::Present(rate)
            }
            None => Annotation::Absent,
        };
        Self { rows, annotation }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Always `(len, 2)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), 2)
    }

    pub fn rows(&self) -> &[[f64; 2]] {
        &self.rows
    }

    pub fn annotation(&self) -> Annotation {
        self.annotation
    }

    /// Rows excluding a known annotation row.
    ///
    /// A `Present` table of a single row keeps it as data, matching
    /// [`IqArray::split_annotation`].
    pub fn data_rows(&self) -> &[[f64; 2]] {
        match self.annotation {
            Annotation::Present(_) if self.rows.len() > 1 => &self.rows[..self.rows.len() - 1],
            _ => &self.rows,
        }
    }

    pub fn i_column(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[0]).collect()
    }

    pub fn q_column(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[1]).collect()
    }

    pub fn to_complex(&self) -> Vec<Complex64> {
        self.rows.iter().map(|r| Complex64::new(r[0], r[1])).collect()
    }

    /// Separate a trailing sample-rate annotation from the data rows.
    ///
    /// Tables built here know whether they carry an annotation. Imported
    /// tables use the legacy rule: more than one row and a last row with
    /// `Q == 0` is an annotation. A single row is never split off.
    pub fn split_annotation(&self) -> AnnotationSplit {
        let split_last = |rows: &[[f64; 2]]| rows[..rows.len() - 1].to_vec();
        match self.annotation {
            Annotation::Present(rate) if self.rows.len() > 1 => AnnotationSplit {
                data: Self {
                    rows: split_last(&self.rows),
                    annotation: Annotation::Absent,
                },
                sample_rate: Some(rate),
            },
            Annotation::Unknown => match self.rows.last() {
                Some(&[rate, q]) if self.rows.len() > 1 && q == 0.0 => AnnotationSplit {
                    data: Self {
                        rows: split_last(&self.rows),
                        annotation: Annotation::Absent,
                    },
                    sample_rate: Some(rate),
                },
                _ => AnnotationSplit {
                    data: self.clone(),
                    sample_rate: None,
                },
            },
            Annotation::Present(_) => AnnotationSplit {
                data: Self {
                    rows: self.rows.clone(),
                    annotation: Annotation::Absent,
                },
                sample_rate: None,
            },
            Annotation::Absent => AnnotationSplit {
                data: self.clone(),
                sample_rate: None,
            },
        }
    }

    /// Population mean / standard deviation / extrema of both columns,
    /// over the data rows only.
    pub fn statistics(&self) -> Result<IqStatistics, IqError> {
        let rows = self.data_rows();
        if rows.is_empty() {
            return Err(IqError::EmptyInput {
                operation: "statistics",
            });
        }
        let n = rows.len() as f64;
        let (i_mean, q_mean) = self.column_means();

        let mut i_var = 0.0;
        let mut q_var = 0.0;
        let mut i_min = f64::INFINITY;
        let mut i_max = f64::NEG_INFINITY;
        let mut q_min = f64::INFINITY;
        let mut q_max = f64::NEG_INFINITY;
        for &[i, q] in rows {
            i_var += (i - i_mean).powi(2);
            q_var += (q - q_mean).powi(2);
            i_min = i_min.min(i);
            i_max = i_max.max(i);
            q_min = q_min.min(q);
            q_max = q_max.max(q);
        }

        Ok(IqStatistics {
            i_mean,
            i_std: (i_var / n).sqrt(),
            q_mean,
            q_std: (q_var / n).sqrt(),
            i_min,
            i_max,
            q_min,
            q_max,
        })
    }

    /// Mean of the I data values; `EmptyInput` on an empty table.
    pub fn i_mean(&self) -> Result<f64, IqError> {
        if self.data_rows().is_empty() {
            return Err(IqError::EmptyInput { operation: "i_mean" });
        }
        Ok(self.column_means().0)
    }

    fn column_means(&self) -> (f64, f64) {
        let rows = self.data_rows();
        let n = rows.len() as f64;
        let (si, sq) = rows
            .iter()
            .fold((0.0, 0.0), |(si, sq), r| (si + r[0], sq + r[1]));
        (si / n, sq / n)
    }

    /// First `min(n, len)` rows.
    pub fn head(&self, n: usize) -> Self {
        let end = n.min(self.rows.len());
        let annotation = match self.annotation {
            // The annotation row survives only when the slice reaches it.
            Annotation::Present(rate) if end == self.rows.len() => Annotation::Present(rate),
            Annotation::Present(_) => Annotation::Absent,
            other => other,
        };
        Self {
            rows: self.rows[..end].to_vec(),
            annotation,
        }
    }

    /// Copy of the table with the I values of its data rows replaced.
    /// An annotation row is carried over unchanged.
    pub(crate) fn with_i_column(&self, i_values: Vec<f64>) -> Self {
        let data = self.data_rows();
        let mut rows: Vec<[f64; 2]> = data
            .iter()
            .zip(i_values)
            .map(|(r, i)| [i, r[1]])
            .collect();
        rows.extend_from_slice(&self.rows[data.len()..]);
        Self {
            rows,
            annotation: self.annotation,
        }
    }
}

impl fmt::Display for IqArray {
    /// Shape summary plus the first five rows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, cols) = self.shape();
        writeln!(f, "IqArray shape=({n}, {cols})")?;
        for row in self.rows.iter().take(5) {
            writeln!(f, "  [{:>12.6}, {:>12.6}]", row[0], row[1])?;
        }
        if n > 5 {
            writeln!(f, "  ... {} more rows", n - 5)?;
        }
        Ok(())
    }
}
