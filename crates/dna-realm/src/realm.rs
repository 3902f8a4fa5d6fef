//! Realm - virtual light DOM of a host element
//!
//! A realm keeps the authoritative (logical) list of a host's children. While
//! closed, children that are not projected somewhere into the host's rendered
//! template are parked in a detached staging fragment. Every node in the
//! logical list is either in that fragment or inside the host's subtree.
//!
//! Mutations validate everything first and only then touch the list, so a
//! failed call changes nothing and notifies nobody.

use std::rc::Rc;

use dna_dom::{DomError, NodeId};

use crate::dom::DomState;
use crate::{ChildInput, Dom, RealmError};

/// Realm identifier (index into the document's realm slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RealmId(pub(crate) u32);

impl RealmId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RealmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "realm#{}", self.0)
    }
}

/// Whether native DOM writes on the host pass through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealmMode {
    /// Native semantics: the adapter steps aside
    #[default]
    Open,
    /// Steady state: the logical list is authoritative
    Closed,
}

/// Observer registration token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Rc<dyn Fn(&[NodeId])>;

pub(crate) struct RealmState {
    pub(crate) node: NodeId,
    pub(crate) fragment: NodeId,
    pub(crate) child_nodes: Vec<NodeId>,
    pub(crate) observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
    pub(crate) virtual_current_node: Option<NodeId>,
    pub(crate) mode: RealmMode,
    pub(crate) initialized: bool,
}

impl std::fmt::Debug for RealmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmState")
            .field("node", &self.node)
            .field("fragment", &self.fragment)
            .field("child_nodes", &self.child_nodes)
            .field("observers", &self.observers.len())
            .field("virtual_current_node", &self.virtual_current_node)
            .field("mode", &self.mode)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl RealmState {
    pub(crate) fn new(node: NodeId, fragment: NodeId) -> Self {
        Self {
            node,
            fragment,
            child_nodes: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
            virtual_current_node: None,
            mode: RealmMode::Open,
            initialized: false,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.mode == RealmMode::Open
    }

    /// Closed -> Open. False if already open.
    pub(crate) fn open(&mut self) -> bool {
        if self.is_open() {
            return false;
        }
        self.mode = RealmMode::Open;
        true
    }

    /// Open -> Closed. False if already closed.
    pub(crate) fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.mode = RealmMode::Closed;
        true
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.child_nodes.iter().position(|&n| n == node)
    }

    fn remove_from_list(&mut self, node: NodeId) -> bool {
        match self.position(node) {
            Some(pos) => {
                self.child_nodes.remove(pos);
                if self.virtual_current_node == Some(node) {
                    self.virtual_current_node = None;
                }
                true
            }
            None => false,
        }
    }
}

/// Handle to the realm of a host element
#[derive(Clone)]
pub struct Realm {
    dom: Dom,
    id: RealmId,
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm").field("id", &self.id).finish()
    }
}

impl PartialEq for Realm {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.dom.same_document(&other.dom)
    }
}

impl Eq for Realm {}

impl Realm {
    pub(crate) fn from_parts(dom: Dom, id: RealmId) -> Self {
        Self { dom, id }
    }

    pub fn id(&self) -> RealmId {
        self.id
    }

    /// Document this realm lives in
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Host element
    pub fn node(&self) -> NodeId {
        self.dom.state().realm(self.id).node
    }

    /// Staging fragment
    pub fn fragment(&self) -> NodeId {
        self.dom.state().realm(self.id).fragment
    }

    /// Snapshot of the logical children
    pub fn child_nodes(&self) -> Vec<NodeId> {
        self.dom.state().realm(self.id).child_nodes.clone()
    }

    pub fn mode(&self) -> RealmMode {
        self.dom.state().realm(self.id).mode
    }

    pub fn is_open(&self) -> bool {
        self.mode() == RealmMode::Open
    }

    /// Adopt the host's current children. Runs once per lifetime; later
    /// calls are no-ops until `restore()`.
    pub fn initialize(&self) -> Result<(), RealmError> {
        {
            let mut state = self.dom.state_mut();
            if state.realm(self.id).initialized {
                return Ok(());
            }
            let host = state.realm(self.id).node;
            let children = state.document.tree.child_ids(host);
            for &child in &children {
                state.registry.check_parent_realm(child, self.id)?;
            }

            state.realm_mut(self.id).open();
            let fragment = state.realm(self.id).fragment;
            for &child in &children {
                state.registry.set_parent_realm(child, self.id)?;
                state.document.tree.append_child(fragment, child)?;
            }
            let realm = state.realm_mut(self.id);
            realm.child_nodes.extend(children);
            realm.initialized = true;
            realm.close();
            tracing::debug!(realm = %self.id, %host, children = realm.child_nodes.len(), "realm initialized");
        }
        self.notify();
        Ok(())
    }

    /// Give the children back to the host as plain DOM, in logical order.
    /// The realm is left open.
    ///
    /// Children this realm projected into a nested realm are taken back from
    /// it; those realms are notified.
    pub fn restore(&self) {
        let mut pending = Vec::new();
        {
            let mut state = self.dom.state_mut();
            state.realm_mut(self.id).open();
            let host = state.realm(self.id).node;
            let children = std::mem::take(&mut state.realm_mut(self.id).child_nodes);
            for &child in &children {
                state.reclaim_projected(self.id, child, &mut pending);
                if state.release(self.id, child).is_none() {
                    state.forget_text(self.id, child);
                }
                // Logical children are never ancestors of their host
                let _ = state.document.tree.append_child(host, child);
            }
            let realm = state.realm_mut(self.id);
            realm.virtual_current_node = None;
            realm.initialized = false;
            tracing::debug!(realm = %self.id, %host, children = children.len(), "realm restored");
        }
        self.dom.flush(pending);
    }

    /// Register an observer, called with a snapshot after every mutation
    pub fn observe(&self, callback: impl Fn(&[NodeId]) + 'static) -> ObserverId {
        let mut state = self.dom.state_mut();
        let realm = state.realm_mut(self.id);
        let id = ObserverId(realm.next_observer);
        realm.next_observer += 1;
        realm.observers.push((id, Rc::new(callback)));
        id
    }

    /// Remove an observer. False if it was not registered.
    pub fn unobserve(&self, observer: ObserverId) -> bool {
        let mut state = self.dom.state_mut();
        let realm = state.realm_mut(self.id);
        let before = realm.observers.len();
        realm.observers.retain(|(id, _)| *id != observer);
        let removed = realm.observers.len() != before;
        if !removed {
            tracing::warn!(realm = %self.id, ?observer, "unobserve: unknown observer");
        }
        removed
    }

    /// Open the realm. Returns false (and does nothing) if already open.
    pub fn dangerously_open(&self) -> bool {
        let opened = self.dom.state_mut().realm_mut(self.id).open();
        if opened {
            tracing::debug!(realm = %self.id, "realm opened");
        }
        opened
    }

    /// Close the realm. Returns false (and does nothing) if already closed.
    pub fn dangerously_close(&self) -> bool {
        let closed = self.dom.state_mut().realm_mut(self.id).close();
        if closed {
            tracing::debug!(realm = %self.id, "realm closed");
        } else {
            tracing::warn!(realm = %self.id, "close requested on a realm that is not open");
        }
        closed
    }

    /// Append children to the logical list
    pub fn append<I>(&self, items: I) -> Result<Vec<NodeId>, RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        self.insert_before(items, None)
    }

    /// Insert children at the start of the logical list
    pub fn prepend<I>(&self, items: I) -> Result<Vec<NodeId>, RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        let first = self.dom.state().realm(self.id).child_nodes.first().copied();
        self.insert_before(items, first)
    }

    /// Insert children before `reference`, a logical child (or at the end
    /// when `None`). Returns the inserted nodes.
    pub fn insert_before<I>(
        &self,
        items: I,
        reference: Option<NodeId>,
    ) -> Result<Vec<NodeId>, RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        let items: Vec<ChildInput> = items.into_iter().map(Into::into).collect();
        let mut pending = Vec::new();
        let result = self
            .dom
            .state_mut()
            .insert_nodes(self.id, items, reference, &mut pending);
        self.dom.flush(pending);
        result
    }

    /// Replace the logical child `old` with `items`. Returns `old`.
    pub fn replace_child<I>(&self, items: I, old: NodeId) -> Result<NodeId, RealmError>
    where
        I: IntoIterator,
        I::Item: Into<ChildInput>,
    {
        let items: Vec<ChildInput> = items.into_iter().map(Into::into).collect();
        let mut pending = Vec::new();
        let result = self
            .dom
            .state_mut()
            .replace_node(self.id, items, old, &mut pending);
        self.dom.flush(pending);
        result
    }

    /// Remove a logical child. Returns it.
    pub fn remove_child(&self, node: NodeId) -> Result<NodeId, RealmError> {
        let mut pending = Vec::new();
        let result = self.dom.state_mut().remove_node(self.id, node, &mut pending);
        self.dom.flush(pending);
        result
    }

    /// Claim `node` for this realm's ownership domain
    pub fn own(&self, node: NodeId) -> Result<(), RealmError> {
        self.dom.state_mut().registry.set_owner_realm(node, self.id)
    }

    /// Whether `other`'s host sits inside this realm's host, in the
    /// flattened tree (staged nodes count as children of their host)
    pub fn contains(&self, other: &Realm) -> bool {
        self.dom.same_document(&other.dom) && self.dom.state().realm_contains(self.id, other.id)
    }

    pub(crate) fn notify(&self) {
        let (snapshot, observers, html) = {
            let state = self.dom.state();
            let realm = state.realm(self.id);
            let html = state.config.log_mutations.then(|| {
                realm
                    .child_nodes
                    .iter()
                    .map(|&n| state.document.tree.serialize(n))
                    .collect::<String>()
            });
            let observers: Vec<Observer> = realm.observers.iter().map(|(_, cb)| Rc::clone(cb)).collect();
            (realm.child_nodes.clone(), observers, html)
        };
        tracing::trace!(realm = %self.id, children = snapshot.len(), observers = observers.len(), "notify");
        if let Some(html) = html {
            tracing::trace!(realm = %self.id, %html, "logical children");
        }
        for callback in observers {
            callback(&snapshot);
        }
    }
}

impl DomState {
    pub(crate) fn realm_contains(&self, outer: RealmId, inner: RealmId) -> bool {
        self.flattened_contains(self.realm(outer).node, self.realm(inner).node)
    }

    fn ensure_child(&self, realm: RealmId, node: NodeId) -> Result<(), RealmError> {
        let state = self.realm(realm);
        if state.child_nodes.contains(&node) {
            Ok(())
        } else {
            Err(DomError::NotFound { parent: state.node, child: node }.into())
        }
    }

    /// Refuse moves out of unrelated realms when they are disabled
    fn validate_moves(&self, realm: RealmId, items: &[ChildInput]) -> Result<(), RealmError> {
        if self.config.allow_cross_realm_moves {
            return Ok(());
        }
        for item in items {
            let ChildInput::Node(node) = item else {
                continue;
            };
            if let Some(source) = self.registry.parent_realm(*node) {
                if source != realm && !self.realm_contains(source, realm) {
                    self.registry.check_parent_realm(*node, realm)?;
                }
            }
        }
        Ok(())
    }

    /// First logical child at or after `start` that is not being inserted
    fn next_anchor(
        &self,
        realm: RealmId,
        start: NodeId,
        nodes: &[NodeId],
        inclusive: bool,
    ) -> Option<NodeId> {
        let list = &self.realm(realm).child_nodes;
        let pos = list.iter().position(|&n| n == start)?;
        let from = if inclusive { pos } else { pos + 1 };
        list[from..].iter().copied().find(|n| !nodes.contains(n))
    }

    pub(crate) fn insert_nodes(
        &mut self,
        realm: RealmId,
        items: Vec<ChildInput>,
        reference: Option<NodeId>,
        pending: &mut Vec<RealmId>,
    ) -> Result<Vec<NodeId>, RealmError> {
        if let Some(reference) = reference {
            self.ensure_child(realm, reference)?;
        }
        self.validate_inputs(realm, &items)?;
        self.validate_moves(realm, &items)?;

        let nodes = self.import(realm, items)?;
        if nodes.is_empty() {
            return Ok(nodes);
        }
        let anchor = reference.and_then(|r| self.next_anchor(realm, r, &nodes, true));
        self.place(realm, &nodes, anchor, pending)?;
        tracing::trace!(realm = %realm, count = nodes.len(), anchor = ?anchor, "insert");
        pending.push(realm);
        Ok(nodes)
    }

    pub(crate) fn replace_node(
        &mut self,
        realm: RealmId,
        items: Vec<ChildInput>,
        old: NodeId,
        pending: &mut Vec<RealmId>,
    ) -> Result<NodeId, RealmError> {
        self.ensure_child(realm, old)?;
        self.validate_inputs(realm, &items)?;
        self.validate_moves(realm, &items)?;

        let nodes = self.import(realm, items)?;
        // The anchor must be computed before `old` leaves the list and must
        // skip replacement nodes that currently follow `old`
        let anchor = self.next_anchor(realm, old, &nodes, false);
        if !nodes.contains(&old) {
            self.detach_logical(realm, old, true);
        }
        if !nodes.is_empty() {
            self.place(realm, &nodes, anchor, pending)?;
        }
        tracing::trace!(realm = %realm, %old, count = nodes.len(), anchor = ?anchor, "replace");
        pending.push(realm);
        Ok(old)
    }

    pub(crate) fn remove_node(
        &mut self,
        realm: RealmId,
        node: NodeId,
        pending: &mut Vec<RealmId>,
    ) -> Result<NodeId, RealmError> {
        self.ensure_child(realm, node)?;
        self.detach_logical(realm, node, true);
        tracing::trace!(realm = %realm, %node, "remove");
        pending.push(realm);
        Ok(node)
    }

    /// Move already-imported nodes into `realm` before `anchor`, taking them
    /// from whichever realm held them first
    fn place(
        &mut self,
        realm: RealmId,
        nodes: &[NodeId],
        anchor: Option<NodeId>,
        pending: &mut Vec<RealmId>,
    ) -> Result<(), RealmError> {
        for &node in nodes {
            while let Some(source) = self.registry.parent_realm(node) {
                if source == realm {
                    break;
                }
                if self.realm_contains(source, realm) {
                    // Projection into a nested realm: the ancestor keeps the
                    // node in its logical list
                    self.registry.clear_parent_realm(node);
                    tracing::debug!(%node, from = %source, to = %realm, "parent realm handed to nested realm");
                    break;
                }
                self.detach_logical(source, node, false);
                tracing::debug!(%node, from = %source, to = %realm, "cross-realm move");
                pending.push(source);
            }
        }

        let state = self.realm_mut(realm);
        state.child_nodes.retain(|n| !nodes.contains(n));
        let index = anchor
            .and_then(|a| state.position(a))
            .unwrap_or(state.child_nodes.len());
        state.child_nodes.splice(index..index, nodes.iter().copied());

        let fragment = state.fragment;
        let tree = &mut self.document.tree;
        let staged_anchor = anchor.filter(|&a| tree.parent(a) == Some(fragment));
        for &node in nodes {
            self.registry.set_parent_realm(node, realm)?;
            tree.insert_before(fragment, node, staged_anchor)?;
        }
        Ok(())
    }

    /// Take `node` out of `realm`'s list and drop the parent relation.
    ///
    /// If an enclosing realm still lists the node (it was projected into this
    /// one), the relation goes back to it; with `restage` the node is also
    /// parked in that realm's fragment, otherwise it is just unlinked.
    fn detach_logical(&mut self, realm: RealmId, node: NodeId, restage: bool) {
        self.realm_mut(realm).remove_from_list(node);
        let holder = self.release(realm, node);
        self.document.tree.detach(node);
        match holder {
            Some(holder) if restage => {
                let fragment = self.realm(holder).fragment;
                let _ = self.document.tree.append_child(fragment, node);
            }
            Some(_) => {}
            None => self.forget_text(realm, node),
        }
    }

    /// Drop the relations of a text node `realm` created once it is no
    /// longer in any logical list
    fn forget_text(&mut self, realm: RealmId, node: NodeId) {
        let created_here = self.document.tree.get(node).is_some_and(|n| n.is_text())
            && self.registry.owner_realm(node) == Some(realm);
        if created_here {
            self.registry.forget(node);
        }
    }

    /// Take `node` out of every realm nested in `realm` that lists it
    fn reclaim_projected(&mut self, realm: RealmId, node: NodeId, pending: &mut Vec<RealmId>) {
        let nested: Vec<RealmId> = (0..self.realms.len())
            .map(|i| RealmId(i as u32))
            .filter(|&other| {
                other != realm
                    && self.realm(other).child_nodes.contains(&node)
                    && self.realm_contains(realm, other)
            })
            .collect();
        for other in nested {
            self.realm_mut(other).remove_from_list(node);
            if self.registry.parent_realm(node) == Some(other) {
                self.registry.clear_parent_realm(node);
            }
            tracing::debug!(%node, from = %other, to = %realm, "projected node reclaimed on restore");
            pending.push(other);
        }
    }

    /// Drop `realm`'s parent relation on `node`, handing it back to any other
    /// realm that still lists the node. Returns that realm.
    pub(crate) fn release(&mut self, realm: RealmId, node: NodeId) -> Option<RealmId> {
        if self.registry.parent_realm(node) == Some(realm) {
            self.registry.clear_parent_realm(node);
        }
        let holder = self
            .realms
            .iter()
            .position(|r| r.child_nodes.contains(&node))
            .map(|i| RealmId(i as u32))
            .filter(|&h| h != realm)?;
        if self.registry.parent_realm(node).is_none() {
            // Cannot conflict: the relation was just cleared
            let _ = self.registry.set_parent_realm(node, holder);
        }
        Some(holder)
    }
}
