#![forbid(unsafe_code)]

//! Structural mutation observation.
//!
//! Observers register against a target node with [`ObserveOptions`] and
//! receive batches of [`MutationRecord`]s. Records are routed to interested
//! observers at mutation time and queue per observer until the document
//! delivers them (see [`Document::flush`](crate::Document::flush)); callbacks
//! never run inline with the mutation that produced a record.
//!
//! # Invariants
//!
//! 1. **Routing happens at mutation time**: whether an observer hears about a
//!    change is decided against the tree as it is when the change happens,
//!    not when the batch is delivered.
//! 2. **Registration order**: observers with pending records are notified in
//!    the order they registered.
//! 3. **One pass per flush**: records queued while a batch is being delivered
//!    wait for the next delivery pass.
//! 4. **Disconnect drops pending**: an observer unregistered before delivery
//!    never sees its queued records.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::document::Document;
use crate::node::NodeId;

bitflags! {
    /// What an observer wants to hear about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObserveOptions: u8 {
        /// Child-list changes (insertions and removals) on the target itself.
        const CHILD_LIST = 1 << 0;
        /// Extend coverage to child-list changes anywhere below the target.
        const SUBTREE = 1 << 1;
    }
}

/// Handle identifying a registered observer within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs#{}", self.0)
    }
}

/// One structural change to a node's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The parent whose child list changed.
    pub target: NodeId,
    /// Nodes appended to `target`, in insertion order.
    pub added: Vec<NodeId>,
    /// Nodes detached from `target`, in removal order.
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn addition(target: NodeId, child: NodeId) -> Self {
        Self {
            target,
            added: vec![child],
            removed: Vec::new(),
        }
    }

    pub(crate) fn removal(target: NodeId, child: NodeId) -> Self {
        Self {
            target,
            added: Vec::new(),
            removed: vec![child],
        }
    }
}

/// Callback invoked with each delivered batch.
///
/// The callback receives a document handle and may freely read or mutate the
/// tree; mutations it performs queue records for the next delivery pass.
pub(crate) type ObserverCallback = Rc<dyn Fn(&Document, &[MutationRecord])>;

struct ObserverEntry {
    id: ObserverId,
    target: NodeId,
    options: ObserveOptions,
    callback: ObserverCallback,
    queue: Vec<MutationRecord>,
}

/// The per-document observer registry.
#[derive(Default)]
pub(crate) struct Observers {
    entries: Vec<ObserverEntry>,
    next_id: u64,
}

impl Observers {
    pub(crate) fn register(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: ObserverCallback,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push(ObserverEntry {
            id,
            target,
            options,
            callback,
            queue: Vec::new(),
        });
        id
    }

    /// Removes the observer and its pending records. Returns whether it existed.
    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Queues `record` on every observer interested in a child-list change at
    /// `record.target`. `inclusive_ancestors` is the target's self-and-up
    /// parent chain at mutation time; it decides `SUBTREE` matches.
    pub(crate) fn route(&mut self, record: &MutationRecord, inclusive_ancestors: &[NodeId]) {
        for entry in &mut self.entries {
            let hit = entry.target == record.target
                || (entry.options.contains(ObserveOptions::SUBTREE)
                    && inclusive_ancestors.contains(&entry.target));
            if hit {
                entry.queue.push(record.clone());
            }
        }
    }

    /// Drains `id`'s queue without invoking its callback.
    pub(crate) fn take(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| std::mem::take(&mut entry.queue))
            .unwrap_or_default()
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.entries.iter().any(|entry| !entry.queue.is_empty())
    }

    /// Takes every non-empty queue together with its callback, in
    /// registration order. Queues refill independently afterwards.
    pub(crate) fn drain_due(&mut self) -> Vec<(ObserverCallback, Vec<MutationRecord>)> {
        self.entries
            .iter_mut()
            .filter(|entry| !entry.queue.is_empty())
            .map(|entry| (Rc::clone(&entry.callback), std::mem::take(&mut entry.queue)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
