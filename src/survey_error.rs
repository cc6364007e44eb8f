//! SurveyError: unified error type for trace-sieve public APIs.
//!
//! Every fallible operation in the crate returns this type. Conditions that
//! only degrade a single trace or selection (empty channel match, malformed
//! bounds, a cache miss, one unparseable metadata record) are *not* errors;
//! they are reported through the `log` facade and the operation continues.
//! Anything that threatens identifier integrity or rewrite correctness is an
//! error and always propagates.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::fid::Fid;

/// Unified error type for trace-sieve operations.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// A hierarchical path did not match the `line_<n>/location_<n>/...`
    /// segment grammar. Surfaced rather than defaulted, because identifiers
    /// derived from paths are used as join keys against metadata.
    #[error("malformed node path `{path}`: {reason}")]
    PathFormat {
        /// The offending path, verbatim.
        path: String,
        /// What was missing or unparseable.
        reason: String,
    },

    /// An identifier field does not fit in its fixed width. Truncating would
    /// silently produce colliding identifiers, so this is a hard error.
    #[error("identifier field `{field}` value {value} does not fit in {width} digits")]
    FidFieldOverflow {
        /// Which of the four fields overflowed.
        field: &'static str,
        /// The out-of-range value.
        value: u32,
        /// The fixed field width, in digits.
        width: usize,
    },

    /// No survey archive exists at the given path.
    #[error("no survey archive at `{0}`")]
    StoreNotFound(PathBuf),

    /// The archive exists but could not be read or written.
    #[error("archive i/o failure at `{path}`")]
    StoreIo {
        /// The archive on disk.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// The file at the given path is not a recognisable survey archive.
    #[error("`{path}` is not a recognisable survey archive: {reason}")]
    StoreFormat {
        /// The archive on disk.
        path: PathBuf,
        /// Why decoding failed.
        reason: String,
    },

    /// A node lookup failed: nothing exists at the path.
    #[error("no node at `{0}` in archive")]
    MissingNode(String),

    /// The node exists but is a group where a trace leaf was required.
    #[error("node `{0}` is not a trace leaf")]
    NotALeaf(String),

    /// The node exists but is a leaf where a group was required.
    #[error("node `{0}` is not a group")]
    NotAGroup(String),

    /// A node already occupies the path targeted by a group or leaf insert.
    #[error("a node already exists at `{0}`")]
    NodeExists(String),

    /// The requested line has no group in the archive.
    #[error("line {0} not present in archive")]
    LineNotFound(u32),

    /// Assembly could not determine a usable matrix shape for the line.
    #[error("line {line}: cannot assemble a trace matrix ({reason})")]
    DegenerateLine {
        /// The implicated line.
        line: u32,
        /// Why no shape could be computed.
        reason: &'static str,
    },

    /// A rewrite destination already exists and `overwrite` was not given.
    /// Nothing has been written when this is returned.
    #[error("destination `{0}` already exists; choose another name or pass overwrite")]
    DestinationExists(PathBuf),

    /// A line group collided inside a freshly created rewrite destination.
    /// Structurally impossible under exclusive access; treated as an
    /// integrity fault and surfaced with the offending group name.
    #[error("group `{0}` already present in a freshly created destination")]
    StructuralConflict(String),

    /// A per-trace metadata annotation could not be parsed. The extraction
    /// layer crops the affected record and continues; parsers return this to
    /// describe what went wrong.
    #[error("metadata for trace {fid} failed to parse: {reason}")]
    MetadataParse {
        /// Identifier of the trace whose annotation was rejected.
        fid: Fid,
        /// Parser diagnostic.
        reason: String,
    },

    /// A mutating operation was attempted on an archive opened read-only.
    #[error("archive `{0}` is opened read-only")]
    ReadOnlyStore(PathBuf),
}
