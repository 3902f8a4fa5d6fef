//! Virtual sibling iterator
//!
//! Marker-based renderers walk `nextSibling`/`previousSibling` from a known
//! node. For staged nodes the physical siblings are whatever happens to sit
//! in the staging fragment, so the walk is served from the logical list
//! instead. The cursor keeps a walk logical even after it steps onto a node
//! that is physically projected into the host.

use dna_dom::NodeId;

use crate::dom::DomState;
use crate::realm::RealmState;
use crate::{Realm, RealmId};

impl RealmState {
    fn logical_sibling(&mut self, node: NodeId, forward: bool) -> Option<NodeId> {
        let sibling = self.child_nodes.iter().position(|&n| n == node).and_then(|pos| {
            if forward {
                self.child_nodes.get(pos + 1).copied()
            } else {
                pos.checked_sub(1).and_then(|prev| self.child_nodes.get(prev).copied())
            }
        });
        self.virtual_current_node = sibling;
        sibling
    }
}

impl DomState {
    pub(crate) fn should_use_virtual_iterator(&self, realm: RealmId, node: NodeId) -> bool {
        let state = self.realm(realm);
        state.virtual_current_node == Some(node)
            || self.document.tree.parent(node) == Some(state.fragment)
    }

    pub(crate) fn virtual_sibling(
        &mut self,
        realm: RealmId,
        node: NodeId,
        forward: bool,
    ) -> Option<NodeId> {
        self.realm_mut(realm).logical_sibling(node, forward)
    }

    /// Point the cursor at `node`, the start of a new walk
    pub(crate) fn set_cursor(&mut self, realm: RealmId, node: Option<NodeId>) {
        self.realm_mut(realm).virtual_current_node = node;
    }
}

impl Realm {
    /// Whether sibling getters on `node` should be answered logically
    pub fn should_use_virtual_iterator(&self, node: NodeId) -> bool {
        self.dom().state().should_use_virtual_iterator(self.id(), node)
    }

    /// Logical previous sibling; moves the cursor onto the result
    pub fn get_previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom().state_mut().virtual_sibling(self.id(), node, false)
    }

    /// Logical next sibling; moves the cursor onto the result
    pub fn get_next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.dom().state_mut().virtual_sibling(self.id(), node, true)
    }

    /// Node the current walk stands on
    pub fn virtual_current_node(&self) -> Option<NodeId> {
        self.dom().state().realm(self.id()).virtual_current_node
    }
}
