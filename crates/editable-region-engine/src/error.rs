use crate::addressing::Path;
use crate::dom::NodeId;

/// Which endpoint of a range failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::End => write!(f, "end"),
        }
    }
}

/// Faults raised by the editing core.
///
/// Addressing and point errors mean the path/node invariant is already broken,
/// so callers should treat them as programming errors rather than retry.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Cannot find child inside the root")]
    NotInRoot,
    #[error("Invalid path: {path}")]
    InvalidPath { path: Path },
    #[error("Invalid {which} point")]
    InvalidPoint { which: Endpoint },
    #[error("Node {node:?} is not a text node")]
    NotAText { node: NodeId },
    #[error("Offset {offset} is out of bounds for node {node:?} (length {length})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        length: usize,
    },
    #[error("Node {node:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, node: NodeId },
    #[error("Mutation capture is already armed")]
    CaptureArmed,
    #[error("Support for Input Event level 1 or higher is required")]
    UnsupportedHost,
    #[error("The host has no selection inside the editable region")]
    NoSelection,
}
