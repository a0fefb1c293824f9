#![forbid(unsafe_code)]

//! Tether: controller-to-element binding with automatic subtree adoption.
//!
//! [`Registry::register`] creates an element for an application object (its
//! "controller") and records the association both ways: the element's owner
//! (back-reference) in a side table, and the controller's root element
//! (forward reference) in its slot. A watcher installed by
//! [`Registry::install`] observes the whole document; whenever nodes are
//! inserted it stamps each inserted subtree with the controller of the
//! nearest owned ancestor, never overwriting an owner a deeper node already
//! has.
//!
//! Ownership flows downward only. Nodes inserted with no owned ancestor are
//! skipped, and re-parenting never re-assigns anything: a node that already
//! has its own owner re-roots adoption below itself.
//!
//! # Example
//!
//! ```
//! use std::any::Any;
//! use std::rc::Rc;
//! use tether::Registry;
//! use tether_dom::Document;
//!
//! struct Panel;
//!
//! let doc = Document::new();
//! let registry = Registry::install(&doc);
//!
//! let panel: Rc<dyn Any> = Rc::new(Panel);
//! let id = registry
//!     .register_with(panel, "div", [("class", "box")])
//!     .unwrap();
//! let element = registry.element_of(id).unwrap();
//!
//! // Label structure before insertion; adoption replays it afterwards.
//! let child = doc.create_element("span").unwrap();
//! doc.append_child(element, child).unwrap();
//! doc.append_child(doc.root(), element).unwrap();
//! doc.flush();
//!
//! assert_eq!(registry.owner_of(child), Some(id));
//! assert_eq!(doc.attribute(element, "class").as_deref(), Some("box"));
//! ```
//!
//! For code that wants a "one page, one observer" shape, the
//! thread-local global pair behind [`document()`], [`register()`], and
//! [`register_with()`] installs its watcher exactly once on first use.

mod adopt;
pub mod registry;

pub use registry::{ControllerId, Registry, document, global, register, register_with};
