#![forbid(unsafe_code)]

//! Document tree: arena storage, structural mutation, and observer delivery.
//!
//! [`Document`] is a cheap-to-clone handle (`Rc<RefCell<_>>`) over a node
//! arena. All structural mutation goes through [`Document::append_child`] and
//! [`Document::remove_child`], which queue [`MutationRecord`]s for the
//! observers registered with [`Document::observe`]; nothing runs observer
//! callbacks inline. Delivery happens when the application calls
//! [`Document::flush`].
//!
//! # Invariants
//!
//! 1. **Ids never dangle**: nodes are arena slots and are never freed.
//!    Removal detaches a node but keeps it addressable for re-insertion.
//! 2. **Single parent**: a node has at most one parent; appending a parented
//!    node moves it rather than aliasing it.
//! 3. **Acyclic**: `append_child` rejects any edge that would make a node its
//!    own ancestor, and the root can never acquire a parent.
//! 4. **Deferred delivery**: mutations only queue records; callbacks run
//!    inside `flush`, after the synchronous batch that queued them completed.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Invalid tag name | `Err(DomError::InvalidTagName)` |
//! | Id out of range for this document | `Err(DomError::UnknownNode)` |
//! | Append creating a cycle (incl. self-append, re-parenting the root) | `Err(DomError::HierarchyViolation)` |
//! | Removing a node that is not a child of the given parent | `Err(DomError::NotAChild)` |
//! | Observing without `CHILD_LIST` | `Err(DomError::InvalidObserveOptions)` |

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::node::{Node, NodeId, ROOT_TAG, validate_tag};
use crate::observer::{MutationRecord, ObserveOptions, ObserverId, Observers};

/// Errors from document-tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The tag name is not a creatable element name.
    InvalidTagName(String),
    /// The node id was not issued by this document.
    UnknownNode(NodeId),
    /// The append would make a node its own ancestor.
    HierarchyViolation { parent: NodeId, child: NodeId },
    /// The node is not currently a child of the given parent.
    NotAChild { parent: NodeId, child: NodeId },
    /// Observe options did not include `CHILD_LIST`.
    InvalidObserveOptions,
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTagName(tag) => write!(f, "invalid tag name: {tag:?}"),
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::HierarchyViolation { parent, child } => {
                write!(f, "appending {child} under {parent} would break the tree")
            }
            Self::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            Self::InvalidObserveOptions => {
                write!(f, "observe options must include CHILD_LIST")
            }
        }
    }
}

impl Error for DomError {}

struct DocumentInner {
    nodes: Vec<Node>,
    observers: Observers,
}

/// Handle to a document tree.
///
/// Cloning is cheap and yields another handle to the same tree. Documents are
/// single-threaded; handles share the tree through an `Rc`.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Document {
    /// Creates an empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let inner = DocumentInner {
            nodes: vec![Node::new(ROOT_TAG)],
            observers: Observers::default(),
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// The root node. Always present; never re-parented.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Creates a detached element of the given tag.
    ///
    /// The element joins the tree only once appended under a connected
    /// parent; until then no observer hears about it.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidTagName`] when `tag` is not a creatable
    /// element name.
    pub fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
        if !validate_tag(tag) {
            return Err(DomError::InvalidTagName(tag.to_string()));
        }
        let mut inner = self.inner.borrow_mut();
        let id = NodeId::new(inner.nodes.len());
        inner.nodes.push(Node::new(tag));
        #[cfg(feature = "tracing")]
        tracing::trace!(node = %id, tag, "created element");
        Ok(id)
    }

    /// Sets (or replaces) an attribute on `node`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids this document never issued.
    pub fn set_attribute(
        &self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let slot = inner.node_mut(node)?;
        slot.attrs.insert(name.into(), value.into());
        Ok(())
    }

    /// The value of attribute `name` on `node`, if present.
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let inner = self.inner.borrow();
        inner.node(node).ok()?.attrs.get(name).cloned()
    }

    /// All attributes of `node`, sorted by name. Empty for unknown ids.
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        let inner = self.inner.borrow();
        let Ok(slot) = inner.node(node) else {
            return Vec::new();
        };
        let mut attrs: Vec<_> = slot
            .attrs
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        attrs.sort();
        attrs
    }

    /// The node's tag name (`#document` for the root).
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.borrow();
        inner.node(node).ok().map(|slot| slot.tag.clone())
    }

    /// The node's current parent, if attached.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        inner.node(node).ok()?.parent
    }

    /// The node's current children, in insertion order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .node(node)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    /// Number of children of `node`.
    #[must_use]
    pub fn child_count(&self, node: NodeId) -> usize {
        let inner = self.inner.borrow();
        inner.node(node).map(|slot| slot.children.len()).unwrap_or(0)
    }

    /// Whether `node` is connected to the document root.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        if inner.node(node).is_err() {
            return false;
        }
        inner.inclusive_ancestors(node).contains(&self.root())
    }

    /// Number of nodes ever created, including the root and detached nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// A parented `child` is moved: one removal record is queued for its old
    /// parent, then one addition record for `parent`. Mutations under a
    /// detached parent queue records too, but no observer rooted in the
    /// document matches them.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for foreign ids and
    /// [`DomError::HierarchyViolation`] when the edge would create a cycle,
    /// `parent == child`, or `child` is the root.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(parent)?;
        inner.node(child)?;
        if child == self.root() || inner.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyViolation { parent, child });
        }
        if let Some(old_parent) = inner.nodes[child.index()].parent {
            inner.detach(old_parent, child);
            inner.queue(MutationRecord::removal(old_parent, child));
        }
        inner.nodes[child.index()].parent = Some(parent);
        inner.nodes[parent.index()].children.push(child);
        inner.queue(MutationRecord::addition(parent, child));
        #[cfg(feature = "tracing")]
        tracing::trace!(parent = %parent, child = %child, "appended child");
        Ok(())
    }

    /// Detaches `child` from `parent`.
    ///
    /// The detached subtree stays intact and addressable; re-inserting it
    /// later is an ordinary append.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for foreign ids and
    /// [`DomError::NotAChild`] when `child` is not currently a child of
    /// `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(parent)?;
        inner.node(child)?;
        if inner.nodes[child.index()].parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        inner.detach(parent, child);
        inner.queue(MutationRecord::removal(parent, child));
        #[cfg(feature = "tracing")]
        tracing::trace!(parent = %parent, child = %child, "removed child");
        Ok(())
    }

    /// Registers a mutation observer on `target`.
    ///
    /// The callback runs only inside [`Document::flush`], never inline with a
    /// mutation. Observers with pending records are notified in registration
    /// order. The subscription lives until [`Document::disconnect`]; the
    /// document keeps the callback alive on its own.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidObserveOptions`] when `options` lacks
    /// [`ObserveOptions::CHILD_LIST`], and [`DomError::UnknownNode`] for
    /// foreign targets.
    pub fn observe(
        &self,
        target: NodeId,
        options: ObserveOptions,
        callback: impl Fn(&Document, &[MutationRecord]) + 'static,
    ) -> Result<ObserverId, DomError> {
        if !options.contains(ObserveOptions::CHILD_LIST) {
            return Err(DomError::InvalidObserveOptions);
        }
        let mut inner = self.inner.borrow_mut();
        inner.node(target)?;
        let id = inner.observers.register(target, options, Rc::new(callback));
        #[cfg(feature = "tracing")]
        tracing::debug!(observer = %id, target = %target, ?options, "observer registered");
        Ok(id)
    }

    /// Unregisters an observer, dropping any records it had pending.
    ///
    /// Returns whether the observer existed.
    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.inner.borrow_mut().observers.disconnect(id)
    }

    /// Removes and returns `id`'s pending records without invoking it.
    ///
    /// Unknown or disconnected ids yield an empty batch.
    #[must_use]
    pub fn take_records(&self, id: ObserverId) -> Vec<MutationRecord> {
        self.inner.borrow_mut().observers.take(id)
    }

    /// Whether any observer still has queued records.
    #[must_use]
    pub fn has_pending_records(&self) -> bool {
        self.inner.borrow().observers.has_pending()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Delivers pending mutation batches: one pass, in registration order.
    ///
    /// Returns the number of records delivered. Callbacks may mutate the tree
    /// freely; records they queue stay pending for the next pass, so a caller
    /// that wants quiescence loops:
    ///
    /// ```
    /// # let doc = tether_dom::Document::new();
    /// while doc.flush() > 0 {}
    /// ```
    pub fn flush(&self) -> usize {
        let due = self.inner.borrow_mut().observers.drain_due();
        let mut delivered = 0;
        for (callback, records) in due {
            delivered += records.len();
            callback(self, &records);
        }
        #[cfg(feature = "tracing")]
        if delivered > 0 {
            tracing::trace!(records = delivered, "flushed mutation batch");
        }
        delivered
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &inner.nodes.len())
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl DocumentInner {
    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    /// `node` and every ancestor above it, bottom-up.
    fn inclusive_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.nodes[id.index()].parent;
        }
        chain
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inclusive_ancestors(node).contains(&ancestor)
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.retain(|&c| c != child);
        self.nodes[child.index()].parent = None;
    }

    /// Routes a fresh record against the tree as it is right now.
    fn queue(&mut self, record: MutationRecord) {
        let chain = self.inclusive_ancestors(record.target);
        self.observers.route(&record, &chain);
    }
}
