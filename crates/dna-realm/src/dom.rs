//! Shared document handle
//!
//! One `Dom` per document. It owns the physical tree, every realm and the
//! ownership side tables behind a single `RefCell`; handles are cheap clones
//! of the same `Rc`. Borrows never outlive a call, so observers and
//! `request_update` callbacks are free to call back in.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use dna_dom::{Document, DomError, DomTree, NodeId};

use crate::realm::RealmState;
use crate::{Config, OwnershipRegistry, Realm, RealmError, RealmId};

/// Shared document: physical tree, realms and ownership relations
#[derive(Clone, Debug)]
pub struct Dom {
    inner: Rc<RefCell<DomState>>,
}

#[derive(Debug)]
pub(crate) struct DomState {
    pub(crate) document: Document,
    pub(crate) realms: Vec<RealmState>,
    pub(crate) registry: OwnershipRegistry,
    /// Staging fragment -> realm that stages into it
    pub(crate) fragments: HashMap<NodeId, RealmId>,
    pub(crate) config: Config,
}

impl Dom {
    /// Create a document with html/head/body and default options
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a document with custom options
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DomState {
                document: Document::new(),
                realms: Vec::new(),
                registry: OwnershipRegistry::new(),
                fragments: HashMap::new(),
                config,
            })),
        }
    }

    /// Whether two handles point at the same document
    pub fn same_document(&self, other: &Dom) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn state(&self) -> Ref<'_, DomState> {
        self.inner.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, DomState> {
        self.inner.borrow_mut()
    }

    /// Read the physical tree, bypassing every realm
    pub fn native<R>(&self, f: impl FnOnce(&DomTree) -> R) -> R {
        f(&self.state().document.tree)
    }

    /// Mutate the physical tree, bypassing every realm
    ///
    /// Only for code that knows it is allowed to: a component writing its
    /// own template inside `request_update`, or test fixtures.
    pub fn native_mut<R>(&self, f: impl FnOnce(&mut DomTree) -> R) -> R {
        f(&mut self.state_mut().document.tree)
    }

    /// Active options
    pub fn config(&self) -> Config {
        self.state().config.clone()
    }

    /// `<body>` of the document
    pub fn body(&self) -> Option<NodeId> {
        self.state().document.body()
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.native_mut(|tree| tree.create_element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&self, content: &str) -> NodeId {
        self.native_mut(|tree| tree.create_text(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&self, content: &str) -> NodeId {
        self.native_mut(|tree| tree.create_comment(content))
    }

    /// Create an empty document fragment
    pub fn create_fragment(&self) -> NodeId {
        self.native_mut(|tree| tree.create_fragment())
    }

    /// Physical outer HTML of a node
    pub fn serialize(&self, node: NodeId) -> String {
        self.native(|tree| tree.serialize(node))
    }

    /// Attach a realm to `host`. The host becomes owned by the new realm.
    pub fn create_realm(&self, host: NodeId) -> Result<Realm, RealmError> {
        let id = {
            let mut state = self.state_mut();
            let tree = &state.document.tree;
            if !tree.get(host).is_some_and(|n| n.is_element()) {
                return Err(DomError::InvalidNode(host).into());
            }

            let id = RealmId(state.realms.len() as u32);
            state.registry.set_owner_realm(host, id)?;
            let fragment = state.document.tree.create_fragment();
            state.realms.push(RealmState::new(host, fragment));
            state.fragments.insert(fragment, id);
            id
        };
        tracing::debug!(%host, realm = %id, "realm created");
        Ok(Realm::from_parts(self.clone(), id))
    }

    /// Realm attached to `host`, if any
    pub fn realm_of(&self, host: NodeId) -> Option<Realm> {
        let id = {
            let state = self.state();
            let id = state.registry.owner_realm(host)?;
            (state.realms.get(id.index())?.node == host).then_some(id)?
        };
        Some(Realm::from_parts(self.clone(), id))
    }

    /// Handle for a realm id
    pub(crate) fn realm(&self, id: RealmId) -> Realm {
        Realm::from_parts(self.clone(), id)
    }

    /// Deliver pending notifications, in order, once per realm
    pub(crate) fn flush(&self, pending: Vec<RealmId>) {
        let mut seen = Vec::with_capacity(pending.len());
        for id in pending {
            if !seen.contains(&id) {
                seen.push(id);
                self.realm(id).notify();
            }
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomState {
    pub(crate) fn realm(&self, id: RealmId) -> &RealmState {
        &self.realms[id.index()]
    }

    pub(crate) fn realm_mut(&mut self, id: RealmId) -> &mut RealmState {
        &mut self.realms[id.index()]
    }

    /// Parent in the flattened tree: a staged node's parent is the host of
    /// the realm staging it
    pub(crate) fn flattened_parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.document.tree.parent(node)?;
        match self.fragments.get(&parent) {
            Some(&realm) => Some(self.realm(realm).node),
            None => Some(parent),
        }
    }

    /// Inclusive ancestry in the flattened tree
    ///
    /// A chain longer than the arena can only come from a cycle written
    /// through `native_mut`; the walk gives up instead of spinning.
    pub(crate) fn flattened_contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        for _ in 0..=self.document.tree.len() {
            let Some(id) = current else {
                return false;
            };
            if id == ancestor {
                return true;
            }
            current = self.flattened_parent(id);
        }
        tracing::warn!(%node, %ancestor, "cycle in flattened tree");
        false
    }

    /// Pre-insert check against the flattened tree: `child` (or, for a
    /// fragment, any of its children) must not be `parent` or one of its
    /// flattened ancestors
    pub(crate) fn ensure_flattened_insert(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), DomError> {
        let tree = &self.document.tree;
        let is_fragment = tree.get(child).is_some_and(|n| n.is_fragment());
        let cycle = self.flattened_contains(child, parent)
            || (is_fragment
                && tree
                    .children(child)
                    .any(|(moved, _)| self.flattened_contains(moved, parent)));
        if cycle {
            tracing::trace!(%parent, %child, "flattened pre-insert validation failed");
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }
}
