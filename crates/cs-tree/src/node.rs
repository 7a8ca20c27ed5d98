//! Node representation.
//!
//! Nodes live in a [`NodeTree`](crate::NodeTree) arena and refer to each
//! other through [`NodeId`]. The parent link is a plain id, so it never
//! owns anything.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact node identifier (index into the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of external resource a [`ResourceRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Directory,
    Url,
    Database,
    Queue,
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::File => "file",
            ResourceKind::Directory => "directory",
            ResourceKind::Url => "url",
            ResourceKind::Database => "database",
            ResourceKind::Queue => "queue",
            ResourceKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Reference to an external resource declared in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_name: String,
    pub kind: ResourceKind,
    pub location: String,
}

/// The closed set of node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Container of uniquely named children, plus an optional attribute section.
    Path {
        children: IndexMap<String, NodeId>,
        attributes: Option<NodeId>,
    },
    /// Leaf holding one string scalar.
    Value { value: String },
    /// Named scalar entries (parameters, properties, attributes).
    KeyValue { entries: IndexMap<String, NodeId> },
    /// Ordered values; names may repeat.
    ListValue { items: Vec<NodeId> },
    /// Ordered `Path` elements.
    ElementList { elements: Vec<NodeId> },
    /// A node pulled in from another source, substituted in place on traversal.
    Include { source: String, target: NodeId },
    /// Leaf describing an external resource.
    Resource(ResourceRef),
}

impl NodeKind {
    /// Short lowercase name of the variant, used in errors and fingerprints.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Path { .. } => "path",
            NodeKind::Value { .. } => "value",
            NodeKind::KeyValue { .. } => "key_value",
            NodeKind::ListValue { .. } => "list_value",
            NodeKind::ElementList { .. } => "element_list",
            NodeKind::Include { .. } => "include",
            NodeKind::Resource(_) => "resource",
        }
    }

    pub(crate) fn empty_path() -> Self {
        NodeKind::Path {
            children: IndexMap::new(),
            attributes: None,
        }
    }
}

/// One node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}
