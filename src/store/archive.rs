//! Default self-describing container for survey archives.
//!
//! [`StoreTree`] is the in-memory group/leaf tree behind the store traits;
//! [`FileArchive`] wraps one tree in a file on disk. The on-disk layout is a
//! small magic-plus-version header followed by the bincode-serialized tree,
//! opaque to callers.
//!
//! An archive handle is a scarce resource. Read handles release on `Drop`;
//! write handles should be retired through [`FileArchive::close`] so that
//! flush failures surface as errors rather than a drop-time warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::tree::{TraceLeaf, TreeStore, TreeStoreMut};
use crate::survey_error::SurveyError;

const MAGIC: &[u8; 8] = b"TRSIEVE1";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 10;

/// One node of the container tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Interior group with named, ordered children.
    Group(BTreeMap<String, Node>),
    /// Trace leaf.
    Leaf(TraceLeaf),
}

/// In-memory hierarchical store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreTree {
    root: BTreeMap<String, Node>,
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl StoreTree {
    /// Empty store.
    pub fn new() -> Self {
        StoreTree::default()
    }

    fn node(&self, path: &str) -> Option<&Node> {
        let mut segments = path_segments(path).into_iter();
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            match current {
                Node::Group(children) => current = children.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(current)
    }

    /// Walk to the parent group of `path`, creating missing intermediate
    /// groups, and return it along with the final segment name.
    fn parent_group_mut<'a>(
        &'a mut self,
        path: &str,
    ) -> Result<(&'a mut BTreeMap<String, Node>, String), SurveyError> {
        let segments = path_segments(path);
        let Some((last, intermediate)) = segments.split_last() else {
            return Err(SurveyError::PathFormat {
                path: path.to_string(),
                reason: "empty path".to_string(),
            });
        };
        let mut current = &mut self.root;
        let mut walked = String::new();
        for segment in intermediate {
            walked = crate::store::tree::join_path(&walked, segment);
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Node::Group(BTreeMap::new()));
            match entry {
                Node::Group(children) => current = children,
                Node::Leaf(_) => return Err(SurveyError::NotAGroup(walked)),
            }
        }
        Ok((current, last.to_string()))
    }

    fn insert_node(&mut self, path: &str, node: Node) -> Result<(), SurveyError> {
        let (parent, name) = self.parent_group_mut(path)?;
        if parent.contains_key(&name) {
            return Err(SurveyError::NodeExists(path.trim_matches('/').to_string()));
        }
        parent.insert(name, node);
        Ok(())
    }
}

fn collect_descendants(children: &BTreeMap<String, Node>, prefix: &str, out: &mut Vec<String>) {
    for (name, node) in children {
        let rel = crate::store::tree::join_path(prefix, name);
        out.push(rel.clone());
        if let Node::Group(grandchildren) = node {
            collect_descendants(grandchildren, &rel, out);
        }
    }
}

impl TreeStore for StoreTree {
    fn contains(&self, path: &str) -> bool {
        path_segments(path).is_empty() || self.node(path).is_some()
    }

    fn is_leaf(&self, path: &str) -> bool {
        matches!(self.node(path), Some(Node::Leaf(_)))
    }

    fn is_group(&self, path: &str) -> bool {
        path_segments(path).is_empty() || matches!(self.node(path), Some(Node::Group(_)))
    }

    fn children(&self, path: &str) -> Result<Vec<String>, SurveyError> {
        if path_segments(path).is_empty() {
            return Ok(self.root.keys().cloned().collect());
        }
        match self.node(path) {
            None => Err(SurveyError::MissingNode(path.trim_matches('/').to_string())),
            Some(Node::Leaf(_)) => Err(SurveyError::NotAGroup(path.trim_matches('/').to_string())),
            Some(Node::Group(children)) => Ok(children.keys().cloned().collect()),
        }
    }

    fn descendants(&self, root: &str) -> Result<Vec<String>, SurveyError> {
        let children = if path_segments(root).is_empty() {
            &self.root
        } else {
            match self.node(root) {
                None => return Err(SurveyError::MissingNode(root.trim_matches('/').to_string())),
                Some(Node::Leaf(_)) => {
                    return Err(SurveyError::NotAGroup(root.trim_matches('/').to_string()));
                }
                Some(Node::Group(children)) => children,
            }
        };
        let mut out = Vec::new();
        collect_descendants(children, "", &mut out);
        Ok(out)
    }

    fn leaf(&self, path: &str) -> Result<&TraceLeaf, SurveyError> {
        match self.node(path) {
            None => Err(SurveyError::MissingNode(path.trim_matches('/').to_string())),
            Some(Node::Group(_)) => Err(SurveyError::NotALeaf(path.trim_matches('/').to_string())),
            Some(Node::Leaf(leaf)) => Ok(leaf),
        }
    }
}

impl TreeStoreMut for StoreTree {
    fn create_group(&mut self, path: &str) -> Result<(), SurveyError> {
        self.insert_node(path, Node::Group(BTreeMap::new()))
    }

    fn put_leaf(&mut self, path: &str, leaf: TraceLeaf) -> Result<(), SurveyError> {
        self.insert_node(path, Node::Leaf(leaf))
    }
}

/// How an archive handle was acquired.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Reading an existing archive; mutation is rejected.
    Read,
    /// Building a new archive; contents are written back on flush/close.
    Write,
}

/// A survey archive on disk.
pub struct FileArchive {
    path: PathBuf,
    mode: OpenMode,
    tree: StoreTree,
    dirty: bool,
}

impl FileArchive {
    /// Open an existing archive read-only.
    ///
    /// # Errors
    /// [`SurveyError::StoreNotFound`] when no file exists at `path`;
    /// [`SurveyError::StoreIo`] / [`SurveyError::StoreFormat`] when the file
    /// cannot be read or is not a survey container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SurveyError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SurveyError::StoreNotFound(path));
        }
        let bytes = fs::read(&path).map_err(|source| SurveyError::StoreIo {
            path: path.clone(),
            source,
        })?;
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(SurveyError::StoreFormat {
                path,
                reason: "missing container magic".to_string(),
            });
        }
        let version = u16::from_le_bytes([bytes[8], bytes[9]]);
        if version != FORMAT_VERSION {
            return Err(SurveyError::StoreFormat {
                path,
                reason: format!("unsupported container version {version}"),
            });
        }
        let tree: StoreTree =
            bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|err| SurveyError::StoreFormat {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        Ok(FileArchive {
            path,
            mode: OpenMode::Read,
            tree,
            dirty: false,
        })
    }

    /// Start a new, empty archive that will be written to `path`.
    ///
    /// Nothing touches the filesystem until [`flush`](Self::flush) or
    /// [`close`](Self::close); an existing file at `path` is replaced at
    /// that point.
    pub fn create(path: impl AsRef<Path>) -> Self {
        FileArchive {
            path: path.as_ref().to_path_buf(),
            mode: OpenMode::Write,
            tree: StoreTree::new(),
            dirty: false,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode this handle was acquired in.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Borrow the underlying tree.
    pub fn tree(&self) -> &StoreTree {
        &self.tree
    }

    fn ensure_writable(&self) -> Result<(), SurveyError> {
        match self.mode {
            OpenMode::Write => Ok(()),
            OpenMode::Read => Err(SurveyError::ReadOnlyStore(self.path.clone())),
        }
    }

    fn write_out(&self) -> Result<(), SurveyError> {
        let body = bincode::serialize(&self.tree).map_err(|err| SurveyError::StoreFormat {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        fs::write(&self.path, bytes).map_err(|source| SurveyError::StoreIo {
            path: self.path.clone(),
            source,
        })
    }

    /// Serialize the current tree to the backing file.
    ///
    /// # Errors
    /// [`SurveyError::ReadOnlyStore`] for a read handle, otherwise the
    /// serialization/filesystem failure.
    pub fn flush(&mut self) -> Result<(), SurveyError> {
        self.ensure_writable()?;
        self.write_out()?;
        self.dirty = false;
        Ok(())
    }

    /// Release the handle, flushing a writable archive first.
    ///
    /// # Errors
    /// Any pending flush failure. Read handles never fail to close.
    pub fn close(mut self) -> Result<(), SurveyError> {
        if self.mode == OpenMode::Write {
            self.flush()?;
        }
        Ok(())
    }
}

/// Unflushed write handles flush on drop, best effort. A failure at this
/// point can only be logged; use [`FileArchive::close`] to observe it.
impl Drop for FileArchive {
    fn drop(&mut self) {
        if self.mode == OpenMode::Write && self.dirty {
            if let Err(err) = self.write_out() {
                log::warn!(
                    "archive `{}` dropped with unflushed changes: {err}",
                    self.path.display()
                );
            }
        }
    }
}

impl TreeStore for FileArchive {
    fn contains(&self, path: &str) -> bool {
        self.tree.contains(path)
    }

    fn is_leaf(&self, path: &str) -> bool {
        self.tree.is_leaf(path)
    }

    fn is_group(&self, path: &str) -> bool {
        self.tree.is_group(path)
    }

    fn children(&self, path: &str) -> Result<Vec<String>, SurveyError> {
        self.tree.children(path)
    }

    fn descendants(&self, root: &str) -> Result<Vec<String>, SurveyError> {
        self.tree.descendants(root)
    }

    fn leaf(&self, path: &str) -> Result<&TraceLeaf, SurveyError> {
        self.tree.leaf(path)
    }
}

impl TreeStoreMut for FileArchive {
    fn create_group(&mut self, path: &str) -> Result<(), SurveyError> {
        self.ensure_writable()?;
        self.tree.create_group(path)?;
        self.dirty = true;
        Ok(())
    }

    fn put_leaf(&mut self, path: &str, leaf: TraceLeaf) -> Result<(), SurveyError> {
        self.ensure_writable()?;
        self.tree.put_leaf(path, leaf)?;
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tree::copy_subtree;

    fn sample_tree() -> StoreTree {
        let mut tree = StoreTree::new();
        tree.put_leaf(
            "line_0/location_0/datacapture_0/echogram_0",
            TraceLeaf::from_samples(vec![1.0, 2.0]),
        )
        .unwrap();
        tree.put_leaf(
            "line_0/location_1/datacapture_0/echogram_0",
            TraceLeaf {
                samples: vec![3.0],
                annotation: Some("<Name>lat</Name><Val>61.2</Val>".to_string()),
            },
        )
        .unwrap();
        tree
    }

    #[test]
    fn lookup_and_capability_queries() {
        let tree = sample_tree();
        assert!(tree.is_group("line_0"));
        assert!(tree.is_group("/line_0/location_0"));
        assert!(tree.is_leaf("line_0/location_0/datacapture_0/echogram_0"));
        assert!(!tree.is_leaf("line_0"));
        assert!(!tree.contains("line_1"));
        assert!(tree.is_group(""));
    }

    #[test]
    fn children_are_ordered_and_typed() {
        let tree = sample_tree();
        assert_eq!(tree.children("").unwrap(), vec!["line_0"]);
        assert_eq!(
            tree.children("line_0").unwrap(),
            vec!["location_0", "location_1"]
        );
        assert!(matches!(
            tree.children("line_0/location_0/datacapture_0/echogram_0"),
            Err(SurveyError::NotAGroup(_))
        ));
        assert!(matches!(
            tree.children("line_9"),
            Err(SurveyError::MissingNode(_))
        ));
    }

    #[test]
    fn descendants_depth_first_relative() {
        let tree = sample_tree();
        assert_eq!(
            tree.descendants("line_0").unwrap(),
            vec![
                "location_0",
                "location_0/datacapture_0",
                "location_0/datacapture_0/echogram_0",
                "location_1",
                "location_1/datacapture_0",
                "location_1/datacapture_0/echogram_0",
            ]
        );
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut tree = sample_tree();
        assert!(matches!(
            tree.create_group("line_0"),
            Err(SurveyError::NodeExists(_))
        ));
        assert!(matches!(
            tree.put_leaf(
                "line_0/location_0/datacapture_0/echogram_0",
                TraceLeaf::default()
            ),
            Err(SurveyError::NodeExists(_))
        ));
    }

    #[test]
    fn leaf_blocks_intermediate_descent() {
        let mut tree = sample_tree();
        assert!(matches!(
            tree.put_leaf(
                "line_0/location_0/datacapture_0/echogram_0/deeper",
                TraceLeaf::default()
            ),
            Err(SurveyError::NotAGroup(_))
        ));
    }

    #[test]
    fn copy_subtree_preserves_annotations() {
        let tree = sample_tree();
        let mut out = StoreTree::new();
        out.create_group("line_0").unwrap();
        copy_subtree(&tree, "line_0/location_1", &mut out, "line_0/location_1").unwrap();
        assert_eq!(
            out.annotation("line_0/location_1/datacapture_0/echogram_0")
                .unwrap(),
            Some("<Name>lat</Name><Val>61.2</Val>")
        );
        assert!(!out.contains("line_0/location_0"));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.tsv");
        let src = sample_tree();
        let mut archive = FileArchive::create(&path);
        copy_subtree(&src, "line_0", &mut archive, "line_0").unwrap();
        archive.close().unwrap();

        let reopened = FileArchive::open(&path).unwrap();
        assert_eq!(reopened.tree(), &src);
        assert_eq!(reopened.mode(), OpenMode::Read);
    }

    #[test]
    fn read_mode_rejects_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.tsv");
        let mut archive = FileArchive::create(&path);
        archive
            .put_leaf("line_0/location_0/datacapture_0/echogram_0", TraceLeaf::default())
            .unwrap();
        archive.close().unwrap();

        let mut reopened = FileArchive::open(&path).unwrap();
        assert!(matches!(
            reopened.create_group("line_1"),
            Err(SurveyError::ReadOnlyStore(_))
        ));
    }

    #[test]
    fn open_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.tsv");
        assert!(matches!(
            FileArchive::open(&missing),
            Err(SurveyError::StoreNotFound(_))
        ));

        let garbage = dir.path().join("garbage.tsv");
        std::fs::write(&garbage, b"not an archive").unwrap();
        assert!(matches!(
            FileArchive::open(&garbage),
            Err(SurveyError::StoreFormat { .. })
        ));
    }
}
