//! DOM errors
//!
//! Messages follow the DOMException wording so callers can surface them
//! the way a browser would.

use crate::NodeId;

/// Errors raised by native tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Reference node is not a child of the target (DOMException `NotFoundError`)
    #[error("NotFoundError: {child} is not a child of this node ({parent})")]
    NotFound { parent: NodeId, child: NodeId },

    /// Insertion would create a cycle or put a node where it cannot live
    #[error("HierarchyRequestError: cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// Member called on a node type that does not have it
    #[error("NotSupportedError: {0} is not an Element or CharacterData node")]
    NotSupported(NodeId),

    /// Id does not point at a live node
    #[error("InvalidNode: {0} does not exist")]
    InvalidNode(NodeId),
}
