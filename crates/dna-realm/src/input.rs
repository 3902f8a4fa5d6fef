//! Child inputs
//!
//! Mutation methods accept nodes, strings and fragments alike. Everything is
//! normalized to a flat list of node ids by `import` before a realm touches
//! its logical list.

use dna_dom::{DomError, NodeData, NodeId};

use crate::dom::DomState;
use crate::{RealmError, RealmId};

/// Something that can be inserted as a child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildInput {
    /// An existing node
    Node(NodeId),
    /// Text, materialized as a new text node
    Text(String),
    /// A document fragment whose children are inserted in its place
    Fragment(NodeId),
}

impl From<NodeId> for ChildInput {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<&str> for ChildInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ChildInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Build an input list from anything convertible
///
/// ```ignore
/// realm.append(inputs!["Hello", span])?;
/// ```
#[macro_export]
macro_rules! inputs {
    ($($item:expr),* $(,)?) => {
        vec![$($crate::ChildInput::from($item)),*]
    };
}

impl DomState {
    /// Reject inputs that can never become children of `realm`'s host.
    /// Runs before any mutation.
    pub(crate) fn validate_inputs(
        &self,
        realm: RealmId,
        items: &[ChildInput],
    ) -> Result<(), RealmError> {
        let host = self.realm(realm).node;
        let tree = &self.document.tree;
        for item in items {
            let id = match item {
                ChildInput::Text(_) => continue,
                ChildInput::Node(id) | ChildInput::Fragment(id) => *id,
            };
            let node = tree.get(id).ok_or(DomError::InvalidNode(id))?;
            if matches!(item, ChildInput::Fragment(_)) && !node.is_fragment() {
                return Err(DomError::HierarchyRequest { parent: host, child: id }.into());
            }
            let invalid = matches!(node.data, NodeData::Document)
                || self.fragments.contains_key(&id)
                || self.flattened_contains(id, host)
                || tree
                    .children(id)
                    .any(|(child, _)| node.is_fragment() && self.flattened_contains(child, host));
            if invalid {
                return Err(DomError::HierarchyRequest { parent: host, child: id }.into());
            }
        }
        Ok(())
    }

    /// Turn inputs into a flat, duplicate-free node list.
    ///
    /// Text becomes new text nodes owned by `realm`; fragments are emptied
    /// into the list. When a node appears twice its last position wins.
    pub(crate) fn import(
        &mut self,
        realm: RealmId,
        items: Vec<ChildInput>,
    ) -> Result<Vec<NodeId>, RealmError> {
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ChildInput::Text(text) => {
                    let id = self.document.tree.create_text(&text);
                    self.registry.set_owner_realm(id, realm)?;
                    nodes.push(id);
                }
                ChildInput::Node(id) | ChildInput::Fragment(id) => {
                    let tree = &mut self.document.tree;
                    if tree.get(id).is_some_and(|n| n.is_fragment()) {
                        for child in tree.child_ids(id) {
                            tree.detach(child);
                            nodes.push(child);
                        }
                    } else {
                        nodes.push(id);
                    }
                }
            }
        }

        let mut unique: Vec<NodeId> = Vec::with_capacity(nodes.len());
        for (i, id) in nodes.iter().enumerate() {
            if !nodes[i + 1..].contains(id) {
                unique.push(*id);
            }
        }
        Ok(unique)
    }
}
