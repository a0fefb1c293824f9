#![forbid(unsafe_code)]

//! Arena-backed document tree with batched child-list mutation observation.
//!
//! This crate provides:
//! - [`Document`] — a cheap-to-clone handle over an arena of element nodes
//! - [`NodeId`] — a dense index identifying a node for the document's lifetime
//! - [`ObserveOptions`] / [`MutationRecord`] / [`ObserverId`] — structural
//!   change observation: mutations queue while application code runs and are
//!   delivered in batches by [`Document::flush`]

pub mod document;
pub mod node;
pub mod observer;

pub use document::{Document, DomError};
pub use node::NodeId;
pub use observer::{MutationRecord, ObserveOptions, ObserverId};
