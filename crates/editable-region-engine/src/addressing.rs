//! Path addressing inside an editable root.
//!
//! A [`Path`] is the sequence of child indices leading from the root to a
//! node. Node handles do not survive the host mutating the tree on its own,
//! but paths do as long as the tree shape is reproduced, so paths are the
//! durable identity of a position.

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::EditError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    /// The empty path, addressing the root itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the `index`-th child of the node this path addresses
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// True when `self` addresses a strict ancestor of `other`
    pub fn is_strict_prefix_of(&self, other: &Path) -> bool {
        self.len() < other.len() && other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Walk from `child` up to `root`, recording each step's sibling index
pub fn path_from_child(doc: &Document, root: NodeId, child: NodeId) -> Result<Path, EditError> {
    let mut indices = Vec::new();
    let mut node = child;

    while node != root {
        let parent = doc.parent(node).ok_or(EditError::NotInRoot)?;
        let index = doc
            .child_index(parent, node)
            .ok_or(EditError::NotAChild { parent, node })?;
        indices.push(index);
        node = parent;
    }

    indices.reverse();
    Ok(Path(indices))
}

/// Follow `path` down from `root`
pub fn child_from_path(doc: &Document, root: NodeId, path: &Path) -> Result<NodeId, EditError> {
    let mut node = root;
    for &index in path.indices() {
        node = *doc
            .children(node)
            .get(index)
            .ok_or_else(|| EditError::InvalidPath { path: path.clone() })?;
    }
    Ok(node)
}
