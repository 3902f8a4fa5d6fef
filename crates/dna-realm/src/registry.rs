//! Ownership Registry
//!
//! Two side tables keyed by node identity. Values are realm ids, never
//! references, so an entry keeps neither the node nor the realm alive.

use std::collections::HashMap;

use dna_dom::NodeId;

use crate::{Relation, RealmError, RealmId};

/// Node to realm relations
#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    parent: HashMap<NodeId, RealmId>,
    owner: HashMap<NodeId, RealmId>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Realm whose logical child list holds `node`
    pub fn parent_realm(&self, node: NodeId) -> Option<RealmId> {
        self.parent.get(&node).copied()
    }

    /// Realm that manages the child list of `node`
    pub fn owner_realm(&self, node: NodeId) -> Option<RealmId> {
        self.owner.get(&node).copied()
    }

    /// Assign the parent realm. Fails if a different realm already holds it.
    pub fn set_parent_realm(&mut self, node: NodeId, realm: RealmId) -> Result<(), RealmError> {
        Self::assign(&mut self.parent, Relation::Parent, node, realm)
    }

    /// Assign the owner realm. Fails if a different realm already owns it.
    pub fn set_owner_realm(&mut self, node: NodeId, realm: RealmId) -> Result<(), RealmError> {
        Self::assign(&mut self.owner, Relation::Owner, node, realm)
    }

    /// Check whether `set_parent_realm(node, realm)` would succeed
    pub fn check_parent_realm(&self, node: NodeId, realm: RealmId) -> Result<(), RealmError> {
        Self::check(&self.parent, Relation::Parent, node, realm)
    }

    /// Drop the parent relation, returning the realm it pointed at
    pub fn clear_parent_realm(&mut self, node: NodeId) -> Option<RealmId> {
        self.parent.remove(&node)
    }

    /// Drop the owner relation, returning the realm it pointed at
    pub fn clear_owner_realm(&mut self, node: NodeId) -> Option<RealmId> {
        self.owner.remove(&node)
    }

    /// Forget both relations of a node
    pub fn forget(&mut self, node: NodeId) {
        self.parent.remove(&node);
        self.owner.remove(&node);
    }

    fn check(
        table: &HashMap<NodeId, RealmId>,
        relation: Relation,
        node: NodeId,
        realm: RealmId,
    ) -> Result<(), RealmError> {
        match table.get(&node) {
            Some(&current) if current != realm => Err(RealmError::Ownership {
                node,
                relation,
                current,
                requested: realm,
            }),
            _ => Ok(()),
        }
    }

    fn assign(
        table: &mut HashMap<NodeId, RealmId>,
        relation: Relation,
        node: NodeId,
        realm: RealmId,
    ) -> Result<(), RealmError> {
        Self::check(table, relation, node, realm)?;
        table.insert(node, realm);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dna_dom::DomTree;

    #[test]
    fn test_single_parent() {
        let mut tree = DomTree::new();
        let node = tree.create_element("span");
        let mut registry = OwnershipRegistry::new();

        registry.set_parent_realm(node, RealmId(0)).unwrap();
        // Same realm again is fine
        registry.set_parent_realm(node, RealmId(0)).unwrap();

        let err = registry.set_parent_realm(node, RealmId(1)).unwrap_err();
        assert_eq!(
            err,
            RealmError::Ownership {
                node,
                relation: Relation::Parent,
                current: RealmId(0),
                requested: RealmId(1),
            }
        );
        assert_eq!(registry.parent_realm(node), Some(RealmId(0)));

        assert_eq!(registry.clear_parent_realm(node), Some(RealmId(0)));
        registry.set_parent_realm(node, RealmId(1)).unwrap();
        assert_eq!(registry.parent_realm(node), Some(RealmId(1)));
    }

    #[test]
    fn test_relations_are_independent() {
        let mut tree = DomTree::new();
        let node = tree.create_element("x-item");
        let mut registry = OwnershipRegistry::new();

        registry.set_owner_realm(node, RealmId(3)).unwrap();
        registry.set_parent_realm(node, RealmId(4)).unwrap();
        assert!(registry.set_owner_realm(node, RealmId(4)).unwrap_err().is_ownership());

        registry.forget(node);
        assert_eq!(registry.owner_realm(node), None);
        assert_eq!(registry.parent_realm(node), None);
    }
}
