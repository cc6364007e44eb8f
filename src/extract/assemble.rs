//! Dense assembly of selected traces into one rectangular matrix.
//!
//! Trace lengths vary within a line, so the matrix takes the maximum sample
//! count as its row dimension and shorter traces are zero-padded below
//! their last sample. The padding is intentional policy, not an error; the
//! domain tolerates variable-length records per line. What *is* an error is
//! a selection from which no shape can be computed at all (no traces, or
//! nothing but empty leaves); assembly then aborts with a diagnostic naming
//! the implicated line rather than returning a garbage array.

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::store::tree::TreeStore;
use crate::survey_error::SurveyError;

/// Dense column-major matrix: rows are samples, columns are traces in
/// selection (location) order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceMatrix<V = f64> {
    rows: usize,
    cols: usize,
    data: Vec<V>,
}

impl<V: Clone + Zero> TraceMatrix<V> {
    /// Zero-filled matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        TraceMatrix {
            rows,
            cols,
            data: vec![V::zero(); rows * cols],
        }
    }

    /// Number of sample rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of trace columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether the matrix holds no samples at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column `j` as a contiguous slice of `rows` samples.
    ///
    /// # Panics
    /// Panics if `j >= cols`.
    #[inline]
    pub fn column(&self, j: usize) -> &[V] {
        assert!(j < self.cols, "column {j} out of range ({} columns)", self.cols);
        &self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Mutable view of column `j`.
    ///
    /// # Panics
    /// Panics if `j >= cols`.
    #[inline]
    pub fn column_mut(&mut self, j: usize) -> &mut [V] {
        assert!(j < self.cols, "column {j} out of range ({} columns)", self.cols);
        &mut self.data[j * self.rows..(j + 1) * self.rows]
    }

    /// Sample at row `i`, column `j`, or `None` out of range.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<&V> {
        if i < self.rows && j < self.cols {
            self.data.get(j * self.rows + i)
        } else {
            None
        }
    }

    /// The whole buffer, column-major.
    #[inline]
    pub fn as_slice(&self) -> &[V] {
        &self.data
    }

    /// Iterate over columns in order.
    pub fn columns(&self) -> impl Iterator<Item = &[V]> {
        (0..self.cols).map(move |j| self.column(j))
    }
}

/// Assemble the ordered leaves into a matrix, returning it together with
/// each leaf's true (pre-padding) sample count.
///
/// # Errors
/// [`SurveyError::DegenerateLine`] when `paths` is empty or every selected
/// leaf is empty; lookup failures from the store propagate unchanged.
pub fn assemble<S>(
    store: &S,
    line: u32,
    paths: &[String],
) -> Result<(TraceMatrix<f64>, Vec<usize>), SurveyError>
where
    S: TreeStore + ?Sized,
{
    if paths.is_empty() {
        return Err(SurveyError::DegenerateLine {
            line,
            reason: "no traces selected",
        });
    }

    // Single pass over the store; lengths fall out of the loaded vectors.
    let mut traces = Vec::with_capacity(paths.len());
    for path in paths {
        traces.push(store.samples(path)?);
    }
    let sample_counts: Vec<usize> = traces.iter().map(Vec::len).collect();

    let rows = sample_counts.iter().copied().max().unwrap_or(0);
    if rows == 0 {
        return Err(SurveyError::DegenerateLine {
            line,
            reason: "every selected trace is empty",
        });
    }

    let mut matrix = TraceMatrix::zeros(rows, traces.len());
    for (j, trace) in traces.iter().enumerate() {
        matrix.column_mut(j)[..trace.len()].clone_from_slice(trace);
    }
    Ok((matrix, sample_counts))
}
