//! Abstract tree store: the capability surface the extraction core needs.
//!
//! The selector, assembler, retention builder, and rewrite engine are all
//! written against [`TreeStore`] / [`TreeStoreMut`] rather than any concrete
//! container, so a different storage engine only has to answer these
//! queries. Whether a node is a leaf is a capability query on the trait,
//! never a downcast against a storage library's runtime types.

use serde::{Deserialize, Serialize};

use crate::survey_error::SurveyError;

/// Reserved marker segment. Nodes whose path contains it hold derived
/// (post-processed) overlays, not raw traces, and are excluded from raw
/// extraction.
pub const PICKED_MARKER: &str = "picked";

/// One stored trace: a 1-D sample vector plus the optional free-form
/// annotation string carrying per-trace acquisition metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceLeaf {
    /// Sampled amplitude values.
    pub samples: Vec<f64>,
    /// Raw annotation text, if the acquisition software recorded one.
    pub annotation: Option<String>,
}

impl TraceLeaf {
    /// Leaf holding bare samples with no annotation.
    pub fn from_samples(samples: Vec<f64>) -> Self {
        TraceLeaf {
            samples,
            annotation: None,
        }
    }
}

/// Read capabilities of a hierarchical survey store.
///
/// Paths are slash-delimited, relative to the store root; the empty string
/// denotes the root group. A leading slash is tolerated.
pub trait TreeStore {
    /// Whether any node exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// Whether the node at `path` is a trace leaf.
    fn is_leaf(&self, path: &str) -> bool;

    /// Whether the node at `path` is a group.
    fn is_group(&self, path: &str) -> bool;

    /// Ordered names of the immediate children of the group at `path`.
    ///
    /// # Errors
    /// [`SurveyError::MissingNode`] if nothing exists at `path`;
    /// [`SurveyError::NotAGroup`] if the node is a leaf.
    fn children(&self, path: &str) -> Result<Vec<String>, SurveyError>;

    /// Every descendant of the group at `root`, depth-first, as paths
    /// relative to `root`.
    ///
    /// # Errors
    /// As [`TreeStore::children`] for a missing or non-group `root`.
    fn descendants(&self, root: &str) -> Result<Vec<String>, SurveyError>;

    /// The trace leaf at `path`.
    ///
    /// # Errors
    /// [`SurveyError::MissingNode`] / [`SurveyError::NotALeaf`].
    fn leaf(&self, path: &str) -> Result<&TraceLeaf, SurveyError>;

    /// The sample vector of the leaf at `path`.
    fn samples(&self, path: &str) -> Result<Vec<f64>, SurveyError> {
        Ok(self.leaf(path)?.samples.clone())
    }

    /// The annotation of the leaf at `path`, if present.
    fn annotation(&self, path: &str) -> Result<Option<&str>, SurveyError> {
        Ok(self.leaf(path)?.annotation.as_deref())
    }
}

/// Write capabilities of a hierarchical survey store.
pub trait TreeStoreMut: TreeStore {
    /// Create a group at `path`, creating missing intermediate groups.
    ///
    /// # Errors
    /// [`SurveyError::NodeExists`] if a node already occupies `path`;
    /// [`SurveyError::NotAGroup`] if an intermediate segment is a leaf;
    /// [`SurveyError::ReadOnlyStore`] on a read-only handle.
    fn create_group(&mut self, path: &str) -> Result<(), SurveyError>;

    /// Insert a leaf at `path`, creating missing intermediate groups.
    ///
    /// # Errors
    /// As [`TreeStoreMut::create_group`].
    fn put_leaf(&mut self, path: &str, leaf: TraceLeaf) -> Result<(), SurveyError>;
}

/// Copy the whole subtree rooted at `src_path` in `src` to `dst_path` in
/// `dst`, preserving group structure, sample vectors, and annotations.
///
/// # Errors
/// Propagates lookup failures from `src` and insert failures from `dst`.
pub fn copy_subtree<S, D>(
    src: &S,
    src_path: &str,
    dst: &mut D,
    dst_path: &str,
) -> Result<(), SurveyError>
where
    S: TreeStore + ?Sized,
    D: TreeStoreMut + ?Sized,
{
    if src.is_leaf(src_path) {
        let leaf = src.leaf(src_path)?.clone();
        return dst.put_leaf(dst_path, leaf);
    }
    dst.create_group(dst_path)?;
    for child in src.children(src_path)? {
        copy_subtree(
            src,
            &join_path(src_path, &child),
            dst,
            &join_path(dst_path, &child),
        )?;
    }
    Ok(())
}

/// Join two path fragments with a single separator; either side may be
/// empty.
pub(crate) fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}/{child}"),
    }
}
