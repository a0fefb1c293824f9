#![forbid(unsafe_code)]

//! Node identity and per-node storage.

use std::fmt;

use ahash::AHashMap;

/// The tag carried by the document root node.
pub(crate) const ROOT_TAG: &str = "#document";

/// Identifies one node in a [`Document`](crate::Document) arena.
///
/// Ids are dense indices issued by the owning document and stay valid for its
/// entire lifetime: removing a node detaches it but never frees its slot.
/// Ids from one document must not be used with another; the receiving
/// document rejects out-of-range ids and cannot detect in-range foreign ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "node arena overflow");
        Self(index as u32)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-node storage: tag, attributes, and tree links.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) tag: String,
    pub(crate) attrs: AHashMap<String, String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: AHashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Whether `tag` names a creatable element.
///
/// Accepted names start with an ASCII letter or `_` and continue with ASCII
/// alphanumerics, `-`, `_`, or `.` — the XML-Name subset real documents use.
/// The reserved root tag `#document` is not creatable.
pub(crate) fn validate_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_tags_accepted() {
        for tag in ["div", "span", "my-widget", "_private", "a", "ns.tag", "h1"] {
            assert!(validate_tag(tag), "{tag:?} should be a creatable tag");
        }
    }

    #[test]
    fn invalid_tags_rejected() {
        for tag in ["", "9div", "di v", "<div>", "#document", "-dash", ".dot", "tag!"] {
            assert!(!validate_tag(tag), "{tag:?} should be rejected");
        }
    }

    #[test]
    fn node_id_display_is_compact() {
        assert_eq!(NodeId::new(0).to_string(), "#0");
        assert_eq!(NodeId::new(42).to_string(), "#42");
    }

    #[test]
    fn fresh_node_is_detached_and_bare() {
        let node = Node::new("div");
        assert_eq!(node.tag, "div");
        assert!(node.parent.is_none());
        assert!(node.children.is_empty());
        assert!(node.attrs.is_empty());
    }
}
