//! Realm errors

use dna_dom::{DomError, NodeId};

use crate::RealmId;

/// Which of the two node-to-realm relations an error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Realm whose logical child list holds the node
    Parent,
    /// Realm that manages the node's child list
    Owner,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Owner => f.write_str("owner"),
        }
    }
}

/// Errors raised by realm operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealmError {
    /// A node already belongs to a different realm
    #[error("ownership violation: {node} already has {relation} realm {current}, refusing {requested}")]
    Ownership {
        node: NodeId,
        relation: Relation,
        current: RealmId,
        requested: RealmId,
    },

    /// Structural error with DOM semantics (`NotFoundError`, `HierarchyRequestError`)
    #[error(transparent)]
    Dom(#[from] DomError),
}

impl RealmError {
    /// True for the DOM `NotFoundError` family
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Dom(DomError::NotFound { .. }))
    }

    /// True for ownership invariant violations
    pub fn is_ownership(&self) -> bool {
        matches!(self, Self::Ownership { .. })
    }
}
