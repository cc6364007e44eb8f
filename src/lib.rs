//! # trace-sieve
//!
//! trace-sieve is a Rust library for working with hierarchical radar survey
//! archives. A survey archive holds raw ice-penetrating radar traces
//! organized as `line_<n>/location_<n>/datacapture_<n>/echogram_<n>`; this
//! crate selects subsets of those traces, assembles them into dense
//! analysis-ready matrices, caches assembled results on disk, and rewrites
//! archives down to their retained locations.
//!
//! ## Features
//! - Typed path grammar and fixed-width trace identifiers for joining
//!   traces against metadata records
//! - An abstract tree-store interface with a bundled file-backed container
//! - Channel/bounds selection with numeric location ordering
//! - Zero-padded rectangular assembly of variable-length traces
//! - Per-location retention flags driving filtered archive rewrites
//!
//! ## Resource model
//!
//! Single-threaded and synchronous. The backing archive is treated as a
//! scarce resource: every [`survey::Survey`] operation opens it, does one
//! logical unit of work, and releases the handle before returning.
//!
//! ## Diagnostics
//!
//! Degraded-but-continuing conditions (an empty channel match, malformed
//! bounds, a cache miss, one unparseable metadata record) are reported
//! through the [`log`] facade; install any `log`-compatible logger to see
//! them. Conditions that would corrupt identifier joins or rewrites are
//! hard errors; see [`survey_error::SurveyError`].

pub mod extract;
pub mod record;
pub mod retain;
pub mod store;
pub mod survey;
pub mod survey_error;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::extract::AssembledLine;
    pub use crate::extract::assemble::{TraceMatrix, assemble};
    pub use crate::extract::cache::{cache_path, try_load};
    pub use crate::extract::select::{Bounds, ChannelSpec, select_line_traces};
    pub use crate::record::{NameValParser, RecordParser, RecordSet, TraceRecord};
    pub use crate::retain::{RetentionMap, write_filtered};
    pub use crate::store::archive::{FileArchive, OpenMode, StoreTree};
    pub use crate::store::fid::Fid;
    pub use crate::store::path::NodePath;
    pub use crate::store::tree::{TraceLeaf, TreeStore, TreeStoreMut, copy_subtree};
    pub use crate::survey::{ExtractOptions, Survey};
    pub use crate::survey_error::SurveyError;
}
