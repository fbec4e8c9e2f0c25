use crate::anchor::MarkerId;
use crate::page::{NodeId, Point};

/// Failures of page-tree operations.
///
/// None of these reach the user. Trigger detection turns them into a silent
/// abort and insertion turns them into its fallback path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist on this page")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not attached to the document")]
    Detached(NodeId),
    #[error("node {0:?} is not a text field")]
    NotAField(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    Hierarchy { parent: NodeId, child: NodeId },
    #[error("boundary point {0:?} is outside the editable root")]
    OutsideRoot(Point),
    #[error("offset {offset} is past the end of {node:?} (length {len})")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("there is no selection")]
    NoSelection,
    #[error("marker {0} is no longer in the document")]
    MarkerMissing(MarkerId),
}
