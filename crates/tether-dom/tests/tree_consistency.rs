//! Model-based consistency checks for the document tree.
//!
//! Random append/remove sequences run against both the real document and a
//! naive adjacency model; the tree structure, connectivity, and the number of
//! records a root subtree observer receives must all agree with the model.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_dom::{Document, NodeId, ObserveOptions};

const NODES: usize = 10;

/// Naive adjacency mirror: index 0 is the root.
struct Model {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl Model {
    fn new() -> Self {
        Self {
            parent: vec![None; NODES],
            children: vec![Vec::new(); NODES],
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: usize, node: usize) -> bool {
        let mut cursor = Some(node);
        while let Some(i) = cursor {
            if i == ancestor {
                return true;
            }
            cursor = self.parent[i];
        }
        false
    }

    fn connected(&self, node: usize) -> bool {
        self.is_inclusive_ancestor(0, node)
    }

    fn detach(&mut self, parent: usize, child: usize) {
        self.children[parent].retain(|&c| c != child);
        self.parent[child] = None;
    }

    fn append(&mut self, parent: usize, child: usize) {
        if let Some(old) = self.parent[child] {
            self.detach(old, child);
        }
        self.parent[child] = Some(parent);
        self.children[parent].push(child);
    }
}

fn ops_strategy() -> impl Strategy<Value = Vec<(bool, usize, usize)>> {
    proptest::collection::vec((any::<bool>(), 0..NODES, 0..NODES), 1..64)
}

proptest! {
    #[test]
    fn random_mutations_stay_consistent(ops in ops_strategy()) {
        let doc = Document::new();
        let mut ids: Vec<NodeId> = vec![doc.root()];
        for _ in 1..NODES {
            ids.push(doc.create_element("div").unwrap());
        }

        let seen = Rc::new(RefCell::new(0usize));
        let seen_in_cb = Rc::clone(&seen);
        doc.observe(
            doc.root(),
            ObserveOptions::CHILD_LIST | ObserveOptions::SUBTREE,
            move |_, records| *seen_in_cb.borrow_mut() += records.len(),
        )
        .unwrap();

        let mut model = Model::new();
        let mut expected_records = 0usize;

        for (is_append, a, b) in ops {
            if is_append {
                // Mirrors the document's rule: the root is immovable and a
                // node can never become its own ancestor.
                let rejected = b == 0 || model.is_inclusive_ancestor(b, a);
                let result = doc.append_child(ids[a], ids[b]);
                prop_assert_eq!(result.is_err(), rejected, "append {} under {}", b, a);
                if !rejected {
                    if let Some(old) = model.parent[b] {
                        if model.connected(old) {
                            expected_records += 1;
                        }
                    }
                    model.append(a, b);
                    if model.connected(a) {
                        expected_records += 1;
                    }
                }
            } else {
                let rejected = model.parent[b] != Some(a);
                let result = doc.remove_child(ids[a], ids[b]);
                prop_assert_eq!(result.is_err(), rejected, "remove {} from {}", b, a);
                if !rejected {
                    if model.connected(a) {
                        expected_records += 1;
                    }
                    model.detach(a, b);
                }
            }
        }

        // Structure agrees with the model.
        for i in 0..NODES {
            let expected_parent = model.parent[i].map(|p| ids[p]);
            prop_assert_eq!(doc.parent(ids[i]), expected_parent, "parent of {}", i);
            let expected_children: Vec<NodeId> =
                model.children[i].iter().map(|&c| ids[c]).collect();
            prop_assert_eq!(doc.children(ids[i]), expected_children, "children of {}", i);
            prop_assert_eq!(doc.contains(ids[i]), model.connected(i), "connectivity of {}", i);
        }

        // Only mutations under connected parents reach the root observer.
        let delivered = doc.flush();
        prop_assert_eq!(delivered, expected_records);
        prop_assert!(!doc.has_pending_records());
    }
}
