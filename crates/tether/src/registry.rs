#![forbid(unsafe_code)]

//! Controller registry: binder, watcher, and the thread-local global pair.
//!
//! [`Registry::install`] creates a registry for one document and subscribes
//! its adoption watcher to the document root with `CHILD_LIST | SUBTREE`.
//! The subscription is never torn down; it lives as long as the document.
//!
//! [`Registry::register`] / [`Registry::register_with`] are the binder: one
//! call creates a detached element, records its owner in the side table,
//! applies attributes, and stores the controller's root element. The caller
//! inserts the element whenever and wherever it likes; the watcher handles
//! the rest on the next [`Document::flush`].
//!
//! # Invariants
//!
//! 1. **One owner per node**: the side table maps each node to at most one
//!    [`ControllerId`]; adoption never replaces an entry already present.
//! 2. **Downward only**: ownership propagates from a node to its current
//!    descendants at delivery time, never to ancestors or siblings.
//! 3. **Removal changes nothing**: removed nodes keep their owners, so a
//!    re-inserted subtree re-roots from its own entries.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tether_dom::{Document, DomError, MutationRecord, NodeId, ObserveOptions};

use crate::adopt::{adopt, seed_for};

/// Identifies one registered controller within its registry.
///
/// Ids are dense and stay valid for the registry's lifetime; controllers are
/// never unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctrl#{}", self.0)
    }
}

/// One registered controller: the application object and its root element.
struct ControllerSlot {
    object: Rc<dyn Any>,
    element: NodeId,
}

#[derive(Default)]
struct RegistryInner {
    slots: Vec<ControllerSlot>,
    /// Back-reference side table: node -> owning controller.
    owners: AHashMap<NodeId, ControllerId>,
}

/// Controller registry for one document.
///
/// Cloning is cheap and yields another handle to the same registry. Like
/// [`Document`], a registry is single-threaded.
#[derive(Clone)]
pub struct Registry {
    document: Document,
    inner: Rc<RefCell<RegistryInner>>,
}

impl Registry {
    /// Creates a registry for `document` and installs its adoption watcher.
    ///
    /// The watcher observes the document root with `CHILD_LIST | SUBTREE`
    /// and runs during [`Document::flush`]. Installing twice on one document
    /// yields two independent registries, each with its own watcher; callers
    /// wanting the one-page-one-observer shape use [`global()`] instead.
    #[must_use]
    pub fn install(document: &Document) -> Self {
        let inner = Rc::new(RefCell::new(RegistryInner::default()));
        let watcher = Rc::clone(&inner);
        let observer = document
            .observe(
                document.root(),
                ObserveOptions::CHILD_LIST | ObserveOptions::SUBTREE,
                move |doc, records| deliver(&watcher, doc, records),
            )
            .expect("root is a known node and the options include CHILD_LIST");
        tracing::debug!(observer = %observer, "adoption watcher installed");
        Self {
            document: document.clone(),
            inner,
        }
    }

    /// Registers `controller` and creates its root element with no attributes.
    ///
    /// # Errors
    ///
    /// Propagates [`DomError::InvalidTagName`] from element creation
    /// unchanged; nothing is registered in that case.
    pub fn register(&self, controller: Rc<dyn Any>, tag: &str) -> Result<ControllerId, DomError> {
        self.register_with(controller, tag, std::iter::empty::<(&str, &str)>())
    }

    /// Registers `controller`: creates a detached element of `tag`, records
    /// the element's owner, applies `attributes`, and stores the element as
    /// the controller's root.
    ///
    /// The element stays detached until the caller inserts it; adoption of
    /// its descendants happens on the flush after insertion.
    ///
    /// # Errors
    ///
    /// Propagates [`DomError::InvalidTagName`] from element creation
    /// unchanged; nothing is registered in that case.
    pub fn register_with<N, V>(
        &self,
        controller: Rc<dyn Any>,
        tag: &str,
        attributes: impl IntoIterator<Item = (N, V)>,
    ) -> Result<ControllerId, DomError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let element = self.document.create_element(tag)?;
        let mut inner = self.inner.borrow_mut();
        let id = ControllerId(inner.slots.len() as u64);
        // Back-reference first, attributes second, forward reference last.
        inner.owners.insert(element, id);
        for (name, value) in attributes {
            self.document.set_attribute(element, name, value)?;
        }
        inner.slots.push(ControllerSlot {
            object: controller,
            element,
        });
        tracing::debug!(controller = %id, element = %element, tag, "controller registered");
        Ok(id)
    }

    /// The controller's root element (forward reference).
    #[must_use]
    pub fn element_of(&self, id: ControllerId) -> Option<NodeId> {
        self.inner
            .borrow()
            .slots
            .get(id.index())
            .map(|slot| slot.element)
    }

    /// The node's owning controller (back-reference), if any.
    #[must_use]
    pub fn owner_of(&self, node: NodeId) -> Option<ControllerId> {
        self.inner.borrow().owners.get(&node).copied()
    }

    /// The registered controller object.
    #[must_use]
    pub fn controller(&self, id: ControllerId) -> Option<Rc<dyn Any>> {
        self.inner
            .borrow()
            .slots
            .get(id.index())
            .map(|slot| Rc::clone(&slot.object))
    }

    /// Number of registered controllers.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// The document this registry watches.
    #[must_use]
    pub fn document(&self) -> Document {
        self.document.clone()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Registry")
            .field("controllers", &inner.slots.len())
            .field("owned_nodes", &inner.owners.len())
            .finish()
    }
}

/// The watcher callback: one pass over a delivered mutation batch.
///
/// Removal records are ignored; removed nodes keep their owners. For each
/// added node, the seed rule picks the owner to propagate (own entry first,
/// parent's second) and the node is skipped when neither exists.
fn deliver(inner: &Rc<RefCell<RegistryInner>>, doc: &Document, records: &[MutationRecord]) {
    let mut inner = inner.borrow_mut();
    for record in records {
        for &node in &record.added {
            match seed_for(doc, &inner.owners, node) {
                Some(seed) => {
                    tracing::trace!(node = %node, owner = %seed, "adopting inserted subtree");
                    adopt(doc, &mut inner.owners, node, seed);
                }
                None => {
                    tracing::trace!(node = %node, "inserted node has no owned ancestor, skipped");
                }
            }
        }
    }
}

thread_local! {
    static GLOBAL: (Document, Registry) = {
        let document = Document::new();
        let registry = Registry::install(&document);
        (document, registry)
    };
}

/// The thread-local global document, created on first use.
///
/// The global pair mirrors a page environment: one document, one adoption
/// watcher installed before any registration can happen, never torn down.
#[must_use]
pub fn document() -> Document {
    GLOBAL.with(|(document, _)| document.clone())
}

/// The registry watching the thread-local global document.
#[must_use]
pub fn global() -> Registry {
    GLOBAL.with(|(_, registry)| registry.clone())
}

/// [`Registry::register`] on the thread-local global registry.
///
/// # Errors
///
/// Propagates [`DomError::InvalidTagName`] from element creation unchanged.
pub fn register(controller: Rc<dyn Any>, tag: &str) -> Result<ControllerId, DomError> {
    global().register(controller, tag)
}

/// [`Registry::register_with`] on the thread-local global registry.
///
/// # Errors
///
/// Propagates [`DomError::InvalidTagName`] from element creation unchanged.
pub fn register_with<N, V>(
    controller: Rc<dyn Any>,
    tag: &str,
    attributes: impl IntoIterator<Item = (N, V)>,
) -> Result<ControllerId, DomError>
where
    N: Into<String>,
    V: Into<String>,
{
    global().register_with(controller, tag, attributes)
}
