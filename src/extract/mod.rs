//! Extraction: selection, dense assembly, and the assembled-line cache.

pub mod assemble;
pub mod cache;
pub mod select;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use assemble::{TraceMatrix, assemble};
pub use cache::{CACHE_EXTENSION, cache_path, try_load};
pub use select::{Bounds, ChannelSpec, select_line_traces};

use crate::record::RecordSet;

/// Everything one line extraction produces, as a single aggregate:
/// the dense matrix, its provenance (store, line, channels), the per-trace
/// metadata records, and a snapshot of the line's retention flags.
///
/// Constructed fresh on a cache miss, or deserialized whole from a cache
/// entry on a hit. This crate never mutates one after construction;
/// downstream analysis owns any further processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledLine {
    /// Samples × traces, location-ordered, zero-padded to the longest trace.
    pub matrix: TraceMatrix<f64>,
    /// The archive the traces came from.
    pub store_path: PathBuf,
    /// Line number.
    pub line: u32,
    /// Channel selector used for the extraction.
    pub channels: ChannelSpec,
    /// True (pre-padding) sample count of each trace column.
    pub sample_counts: Vec<usize>,
    /// Metadata records that survived parsing, in selection order.
    pub records: RecordSet,
    /// Location → retained flag, scoped to this line, as of extraction.
    pub retain: BTreeMap<u32, bool>,
}

impl AssembledLine {
    /// Number of trace columns.
    pub fn num_traces(&self) -> usize {
        self.matrix.cols()
    }

    /// Number of sample rows (the longest selected trace).
    pub fn num_samples(&self) -> usize {
        self.matrix.rows()
    }
}
