//! Hierarchical configuration documents.
//!
//! This crate provides:
//! - An arena-backed node tree with a closed set of node kinds
//! - Borrowed [`NodeRef`] views for path lookup and traversal
//! - Document header metadata and section-name settings
//! - Depth-first walking with transparent includes
//! - Content fingerprints for cache diagnostics

pub mod document;
pub mod header;
pub mod node;
pub mod settings;
pub mod snapshot;
pub mod tree;
pub mod view;
pub mod walk;

pub use document::Document;
pub use header::{Header, Stamp};
pub use node::{Node, NodeId, NodeKind, ResourceKind, ResourceRef};
pub use settings::Settings;
pub use snapshot::DocumentSnapshot;
pub use tree::{NodeTree, TreeError};
pub use view::{Children, NodeRef};
pub use walk::{walk, Visitor};

/// Separator between segments of a node path.
pub const PATH_SEPARATOR: char = '/';
