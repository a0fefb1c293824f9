#![forbid(unsafe_code)]

//! The adoption rule as a pure traversal over the owner side table.
//!
//! Keeping this separate from the observer callback means the rule itself is
//! testable against any `(node, inherited-owner)` pair, with no mutation
//! machinery in the loop.

use ahash::AHashMap;
use tether_dom::{Document, NodeId};

use crate::registry::ControllerId;

/// The controller an inserted node propagates from: the node's own owner if
/// it has one, else its parent's owner read at delivery time. `None` means
/// there is nothing to propagate and the node is skipped.
pub(crate) fn seed_for(
    doc: &Document,
    owners: &AHashMap<NodeId, ControllerId>,
    node: NodeId,
) -> Option<ControllerId> {
    if let Some(&own) = owners.get(&node) {
        return Some(own);
    }
    owners.get(&doc.parent(node)?).copied()
}

/// Stamps `node` and all of its current descendants with `inherited`.
///
/// A node that already has its own owner keeps it and re-roots the traversal:
/// its subtree inherits that owner instead of `inherited`. Running this twice
/// over the same subtree changes nothing on the second pass.
pub(crate) fn adopt(
    doc: &Document,
    owners: &mut AHashMap<NodeId, ControllerId>,
    node: NodeId,
    inherited: ControllerId,
) {
    let owner = *owners.entry(node).or_insert(inherited);
    for child in doc.children(node) {
        adopt(doc, owners, child, owner);
    }
}
