//! DOM compatibility adapter
//!
//! Realm-aware versions of the Node/Element members that rendering
//! libraries use to walk and mutate a tree. Any code that may touch a
//! component host's children goes through these instead of the native
//! `DomTree` methods. When no closed realm is involved every method behaves
//! exactly like its native counterpart.
//!
//! Routing rules:
//! - getters and `before`/`after`/`replace_with`/`remove` consult the
//!   *parent realm* of the node they are called on;
//! - `insert_before`/`append_child`/`remove_child`/`replace_child` consult the
//!   *owner realm* of the element they are called on.

use dna_dom::{DomError, DomTree, NodeId};

use crate::dom::DomState;
use crate::{ChildInput, Dom, Realm, RealmError, RealmId};

impl DomState {
    /// Parent realm of `node`, if it is closed
    fn closed_parent_realm(&self, node: NodeId) -> Option<RealmId> {
        let realm = self.registry.parent_realm(node)?;
        (!self.realm(realm).is_open()).then_some(realm)
    }

    /// Owner realm of the element `parent`, if it is closed
    fn closed_owner_realm(&self, parent: NodeId) -> Option<RealmId> {
        if !self.document.tree.get(parent).is_some_and(|n| n.is_element()) {
            return None;
        }
        let realm = self.registry.owner_realm(parent)?;
        (!self.realm(realm).is_open()).then_some(realm)
    }
}

impl Dom {
    fn closed_parent_realm(&self, node: NodeId) -> Option<Realm> {
        let id = self.state().closed_parent_realm(node)?;
        Some(self.realm(id))
    }

    fn closed_owner_realm(&self, parent: NodeId) -> Option<Realm> {
        let id = self.state().closed_owner_realm(parent)?;
        Some(self.realm(id))
    }

    // --- Getters ---

    /// `Node.parentNode`
    ///
    /// A staged node reports its host instead of the staging fragment.
    pub fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        let state = self.state();
        let tree = &state.document.tree;
        if let Some(realm) = state.closed_parent_realm(node) {
            if !tree.is_connected(node) {
                return Some(state.realm(realm).node);
            }
        }
        tree.parent(node)
    }

    /// `Node.previousSibling`
    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, false)
    }

    /// `Node.nextSibling`
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, true)
    }

    fn sibling(&self, node: NodeId, forward: bool) -> Option<NodeId> {
        let mut state = self.state_mut();
        if state.config.virtual_iterator {
            if let Some(realm) = state.closed_parent_realm(node) {
                if state.should_use_virtual_iterator(realm, node) {
                    return state.virtual_sibling(realm, node, forward);
                }
            }
        }
        let tree = &state.document.tree;
        if forward {
            tree.next_sibling(node)
        } else {
            tree.prev_sibling(node)
        }
    }

    /// `Node.childNodes`: the logical list for a closed host
    pub fn child_nodes(&self, parent: NodeId) -> Vec<NodeId> {
        let state = self.state();
        match state.closed_owner_realm(parent) {
            Some(realm) if state.realm(realm).node == parent => state.realm(realm).child_nodes.clone(),
            _ => state.document.tree.child_ids(parent),
        }
    }

    /// `Node.firstChild`; starts a logical walk on a closed host
    pub fn first_child(&self, parent: NodeId) -> Option<NodeId> {
        self.edge_child(parent, true)
    }

    /// `Node.lastChild`; starts a logical walk on a closed host
    pub fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        self.edge_child(parent, false)
    }

    fn edge_child(&self, parent: NodeId, first: bool) -> Option<NodeId> {
        let mut state = self.state_mut();
        match state.closed_owner_realm(parent) {
            Some(realm) if state.realm(realm).node == parent => {
                let list = &state.realm(realm).child_nodes;
                let child = if first { list.first() } else { list.last() }.copied();
                state.set_cursor(realm, child);
                child
            }
            _ if first => state.document.tree.first_child(parent),
            _ => state.document.tree.last_child(parent),
        }
    }

    // --- ChildNode members (Element and CharacterData) ---

    /// `ChildNode.before(...nodes)`
    pub fn before<I>(&self, node: NodeId, items: I) -> Result<(), RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.ensure_child_node(node)?;
        if let Some(realm) = self.closed_parent_realm(node) {
            realm.insert_before(items, Some(node))?;
            return Ok(());
        }
        let Some(parent) = self.native(|tree| tree.parent(node)) else {
            return Ok(());
        };
        let nodes = self.materialize(items);
        let reference = self.native(|tree| first_outside(tree, Some(node), &nodes));
        self.native_insert_all(parent, &nodes, reference)
    }

    /// `ChildNode.after(...nodes)`
    pub fn after<I>(&self, node: NodeId, items: I) -> Result<(), RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.ensure_child_node(node)?;
        if let Some(realm) = self.closed_parent_realm(node) {
            let list = realm.child_nodes();
            let reference = list
                .iter()
                .position(|&n| n == node)
                .and_then(|pos| list.get(pos + 1).copied());
            realm.insert_before(items, reference)?;
            return Ok(());
        }
        let Some(parent) = self.native(|tree| tree.parent(node)) else {
            return Ok(());
        };
        let nodes = self.materialize(items);
        let reference = self.native(|tree| first_outside(tree, tree.next_sibling(node), &nodes));
        self.native_insert_all(parent, &nodes, reference)
    }

    /// `ChildNode.replaceWith(...nodes)`
    pub fn replace_with<I>(&self, node: NodeId, items: I) -> Result<(), RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.ensure_child_node(node)?;
        if let Some(realm) = self.closed_parent_realm(node) {
            realm.replace_child(items, node)?;
            return Ok(());
        }
        let Some(parent) = self.native(|tree| tree.parent(node)) else {
            return Ok(());
        };
        let nodes = self.materialize(items);
        let reference = self.native(|tree| first_outside(tree, tree.next_sibling(node), &nodes));
        if !nodes.contains(&node) {
            self.native_mut(|tree| tree.detach(node));
        }
        self.native_insert_all(parent, &nodes, reference)
    }

    /// `ChildNode.remove()`
    pub fn remove(&self, node: NodeId) -> Result<(), RealmError> {
        self.ensure_child_node(node)?;
        if let Some(realm) = self.closed_parent_realm(node) {
            realm.remove_child(node)?;
            return Ok(());
        }
        self.native_mut(|tree| tree.detach(node));
        Ok(())
    }

    // --- Node members ---

    /// `Node.appendChild(child)`
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<NodeId, RealmError> {
        self.insert_before(parent, child, None)
    }

    /// `Node.insertBefore(child, reference)`
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, RealmError> {
        if let Some(realm) = self.closed_owner_realm(parent) {
            realm.insert_before([child], reference)?;
            return Ok(child);
        }
        self.state().ensure_flattened_insert(parent, child)?;
        self.take_from_closed_realm(child)?;
        Ok(self.native_mut(|tree| tree.insert_before(parent, child, reference))?)
    }

    /// `Node.removeChild(child)`
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<NodeId, RealmError> {
        if let Some(realm) = self.closed_owner_realm(parent) {
            return realm.remove_child(child);
        }
        if self.native(|tree| tree.parent(child)) != Some(parent) {
            return Err(DomError::NotFound { parent, child }.into());
        }
        self.take_from_closed_realm(child)?;
        self.native_mut(|tree| tree.detach(child));
        Ok(child)
    }

    /// `Node.replaceChild(new, old)`
    pub fn replace_child(
        &self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<NodeId, RealmError> {
        if let Some(realm) = self.closed_owner_realm(parent) {
            return realm.replace_child([new], old);
        }
        self.native(|tree| {
            if tree.parent(old) == Some(parent) {
                Ok(())
            } else {
                Err(DomError::NotFound { parent, child: old })
            }
        })?;
        self.state().ensure_flattened_insert(parent, new)?;
        if new != old {
            self.take_from_closed_realm(new)?;
            self.take_from_closed_realm(old)?;
        }
        Ok(self.native_mut(|tree| tree.replace_child(parent, new, old))?)
    }

    // --- Helpers ---

    /// `before`/`after`/`replace_with`/`remove` exist on Element and
    /// CharacterData only
    fn ensure_child_node(&self, node: NodeId) -> Result<(), RealmError> {
        let supported = self.native(|tree| {
            tree.get(node)
                .map(|n| n.is_element() || n.is_character_data())
                .ok_or(DomError::InvalidNode(node))
        })?;
        if supported {
            Ok(())
        } else {
            Err(DomError::NotSupported(node).into())
        }
    }

    /// A native write is about to move `node` somewhere else: if a closed
    /// realm lists it, that realm gives it up first
    fn take_from_closed_realm(&self, node: NodeId) -> Result<(), RealmError> {
        if let Some(realm) = self.closed_parent_realm(node) {
            tracing::debug!(%node, realm = %realm.id(), "native write takes node out of realm");
            realm.remove_child(node)?;
        }
        Ok(())
    }

    /// Convert inputs to nodes for a native insertion (no realm involved)
    fn materialize<I>(&self, items: I) -> Vec<NodeId>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        let mut nodes = Vec::new();
        for item in items {
            match item.into() {
                ChildInput::Text(text) => nodes.push(self.create_text(&text)),
                ChildInput::Node(id) | ChildInput::Fragment(id) => {
                    let children = self.native(|tree| {
                        tree.get(id)
                            .filter(|n| n.is_fragment())
                            .map(|_| tree.child_ids(id))
                    });
                    match children {
                        Some(children) => nodes.extend(children),
                        None => nodes.push(id),
                    }
                }
            }
        }
        nodes
    }

    /// Native insertion of each node before `reference`, in order
    fn native_insert_all(
        &self,
        parent: NodeId,
        nodes: &[NodeId],
        reference: Option<NodeId>,
    ) -> Result<(), RealmError> {
        {
            let state = self.state();
            for &node in nodes {
                state.ensure_flattened_insert(parent, node)?;
            }
        }
        for &node in nodes {
            self.take_from_closed_realm(node)?;
            self.native_mut(|tree| tree.insert_before(parent, node, reference))?;
        }
        Ok(())
    }
}

/// First node from `start` onwards (following physical siblings) that is not
/// one of the nodes being inserted
fn first_outside(tree: &DomTree, start: Option<NodeId>, nodes: &[NodeId]) -> Option<NodeId> {
    let mut current = start;
    while let Some(id) = current.filter(|id| nodes.contains(id)) {
        current = tree.next_sibling(id);
    }
    current
}
