//! Archive access: typed paths, trace identifiers, the abstract tree store,
//! and the default file-backed container.

pub mod archive;
pub mod fid;
pub mod path;
pub mod tree;

pub use archive::{FileArchive, Node, OpenMode, StoreTree};
pub use fid::Fid;
pub use path::NodePath;
pub use tree::{PICKED_MARKER, TraceLeaf, TreeStore, TreeStoreMut, copy_subtree};
