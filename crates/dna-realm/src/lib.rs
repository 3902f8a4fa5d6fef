//! DNA Realm - virtual light DOM for custom elements
//!
//! Every component host gets a [`Realm`]: a logical child list decoupled
//! from the physical tree. Rendering libraries keep using plain Node/Element
//! calls through the [`Dom`] compatibility adapter, which routes them into
//! the realm while it is closed and straight to the tree while the component
//! renders its own template inside [`Realm::request_update`].

mod compat;
mod component;
mod config;
mod dom;
mod error;
mod input;
mod iterator;
mod realm;
mod registry;
mod update;

pub use component::Component;
pub use config::Config;
pub use dom::Dom;
pub use error::{Relation, RealmError};
pub use input::ChildInput;
pub use realm::{ObserverId, Realm, RealmId, RealmMode};
pub use registry::OwnershipRegistry;
pub use update::OpenGuard;

pub use dna_dom::{DomError, DomTree, NodeId, NodeType};
