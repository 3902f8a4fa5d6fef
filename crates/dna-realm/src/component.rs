//! Component host lifecycle
//!
//! The consumer side of a realm: a custom element host that adopts its
//! children when connected, renders its own template inside an open window,
//! and hands plain DOM back when disconnected.

use std::future::Future;

use dna_dom::NodeId;

use crate::{Dom, ObserverId, Realm, RealmError};

/// A custom element host with its realm
#[derive(Debug, Clone)]
pub struct Component {
    realm: Realm,
}

impl Dom {
    /// Create a detached custom element host with a fresh realm
    pub fn define_component(&self, tag: &str) -> Result<Component, RealmError> {
        let host = self.create_element(tag);
        Component::upgrade(self, host)
    }
}

impl Component {
    /// Attach a realm to an existing element
    pub fn upgrade(dom: &Dom, host: NodeId) -> Result<Self, RealmError> {
        let realm = dom.create_realm(host)?;
        tracing::debug!(%host, tag = ?dom.native(|tree| tree.tag_name(host).map(str::to_string)), "component upgraded");
        Ok(Self { realm })
    }

    pub fn host(&self) -> NodeId {
        self.realm.node()
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn dom(&self) -> &Dom {
        self.realm.dom()
    }

    /// Insert the host under `parent` and adopt its current children
    pub fn connect(&self, parent: NodeId) -> Result<(), RealmError> {
        self.dom().append_child(parent, self.host())?;
        self.realm.initialize()
    }

    /// Hand the children back as plain DOM and take the host out of its parent
    pub fn disconnect(&self) -> Result<(), RealmError> {
        self.realm.restore();
        self.dom().remove(self.host())
    }

    /// Run the component's own render with native writes allowed on the host
    pub fn render<R>(&self, render: impl FnOnce(&Dom) -> R) -> R {
        let dom = self.dom().clone();
        self.realm.request_update(|| render(&dom))
    }

    /// Async render; the host accepts native writes until the future settles
    pub async fn render_async<F, Fut, R>(&self, render: F) -> R
    where
        F: FnOnce(Dom) -> Fut,
        Fut: Future<Output = R>,
    {
        let dom = self.dom().clone();
        self.realm.request_update_async(|| render(dom)).await
    }

    /// Logical (slotted) children
    pub fn slotted(&self) -> Vec<NodeId> {
        self.realm.child_nodes()
    }

    /// Re-render trigger: called with the slotted children after every change
    pub fn on_slot_change(&self, callback: impl Fn(&[NodeId]) + 'static) -> ObserverId {
        self.realm.observe(callback)
    }
}

#[cfg(test)]
mod tests {
    use crate::Dom;

    #[test]
    fn test_connect_adopts_children() {
        let dom = Dom::new();
        let body = dom.body().unwrap();
        let card = dom.define_component("x-card").unwrap();
        let title = dom.create_element("h1");
        dom.append_child(card.host(), title).unwrap();

        card.connect(body).unwrap();
        assert_eq!(card.slotted(), vec![title]);
        assert!(!card.realm().is_open());
        // Staged, not rendered
        assert_eq!(dom.native(|tree| tree.first_child(card.host())), None);
        assert_eq!(dom.parent_node(title), Some(card.host()));
    }

    #[test]
    fn test_disconnect_leaves_plain_dom() {
        let dom = Dom::new();
        let body = dom.body().unwrap();
        let card = dom.define_component("x-card").unwrap();
        card.connect(body).unwrap();
        let nodes = card.realm().append(["one", "two"]).unwrap();

        card.disconnect().unwrap();
        assert!(dom.native(|tree| tree.parent(card.host())).is_none());
        assert_eq!(dom.native(|tree| tree.child_ids(card.host())), nodes);
        assert!(card.slotted().is_empty());
    }
}
