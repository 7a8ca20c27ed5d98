//! Arena-backed node tree and its construction API.
//!
//! Parsers build a [`NodeTree`] top-down with the `add_*` methods. Every
//! method validates the node name and the parent kind, so a finished tree
//! always satisfies: non-empty names, unique sibling names under `Path` and
//! `KeyValue` nodes, exactly one parent per non-root node, no cycles.

use thiserror::Error;

use crate::node::{Node, NodeId, NodeKind, ResourceRef};
use crate::view::NodeRef;
use crate::PATH_SEPARATOR;

/// Default name of the attribute section attached to `Path` nodes.
pub const DEFAULT_ATTRIBUTE_SECTION: &str = "attributes";

/// Errors raised while building or editing a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node names must not be empty")]
    EmptyName,

    #[error("node name `{0}` must not contain '/'")]
    InvalidName(String),

    #[error("duplicate child `{name}` under `{parent}`")]
    DuplicateName { parent: String, name: String },

    #[error("cannot add a {child} node under {parent_kind} node `{parent}`")]
    NotAContainer {
        parent: String,
        parent_kind: &'static str,
        child: &'static str,
    },

    #[error("node `{path}` is a {kind} node, not a value")]
    NotAValue { path: String, kind: &'static str },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl From<TreeError> for cs_common::Error {
    fn from(err: TreeError) -> Self {
        cs_common::Error::InvalidTree(err.to_string())
    }
}

/// Owner of every node of one document.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    attribute_section: String,
}

impl NodeTree {
    /// Create a tree whose root is an empty `Path` node.
    pub fn new(root_name: &str) -> Result<Self, TreeError> {
        check_name(root_name)?;
        Ok(NodeTree {
            nodes: vec![Node {
                name: root_name.to_string(),
                parent: None,
                kind: NodeKind::empty_path(),
            }],
            root: NodeId(0),
            attribute_section: DEFAULT_ATTRIBUTE_SECTION.to_string(),
        })
    }

    /// Use a different name for attribute sections created by [`set_attribute`](Self::set_attribute).
    pub fn with_attribute_section(mut self, name: &str) -> Result<Self, TreeError> {
        check_name(name)?;
        self.attribute_section = name.to_string();
        Ok(self)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_ref(&self) -> NodeRef<'_> {
        NodeRef::new(self, self.root)
    }

    /// Borrowed view of a node, or `None` if the id belongs to another tree.
    pub fn view(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.get(id.index()).map(|_| NodeRef::new(self, id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn attribute_section(&self) -> &str {
        &self.attribute_section
    }

    pub fn add_path(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.attach(parent, name, NodeKind::empty_path())
    }

    /// Add a `Value` leaf under a `Path`, `KeyValue` or `ListValue` node.
    pub fn add_value(
        &mut self,
        parent: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        self.attach(
            parent,
            name,
            NodeKind::Value {
                value: value.into(),
            },
        )
    }

    pub fn add_key_values(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.attach(
            parent,
            name,
            NodeKind::KeyValue {
                entries: Default::default(),
            },
        )
    }

    pub fn add_list(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.attach(parent, name, NodeKind::ListValue { items: Vec::new() })
    }

    pub fn add_element_list(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.attach(
            parent,
            name,
            NodeKind::ElementList {
                elements: Vec::new(),
            },
        )
    }

    /// Append a `Path` element to an `ElementList` node.
    pub fn add_element(&mut self, list: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.attach(list, name, NodeKind::empty_path())
    }

    pub fn add_resource(
        &mut self,
        parent: NodeId,
        name: &str,
        resource: ResourceRef,
    ) -> Result<NodeId, TreeError> {
        self.attach(parent, name, NodeKind::Resource(resource))
    }

    /// Attach a copy of `included`'s root under `parent`, wrapped in an
    /// `Include` node named `name`.
    pub fn add_include(
        &mut self,
        parent: NodeId,
        name: &str,
        source: impl Into<String>,
        included: &NodeTree,
    ) -> Result<NodeId, TreeError> {
        let include = self.attach(
            parent,
            name,
            NodeKind::Include {
                source: source.into(),
                target: NodeId(u32::MAX),
            },
        )?;
        let target = self.graft(included, included.root, include);
        if let NodeKind::Include { target: slot, .. } = &mut self.nodes[include.index()].kind {
            *slot = target;
        }
        Ok(include)
    }

    /// Set an attribute on a `Path` node, creating its attribute section on
    /// first use. Returns the id of the attribute's `Value` node.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        check_name(key)?;
        let (existing, shadowed) = match &self.node(node)?.kind {
            NodeKind::Path {
                attributes,
                children,
            } => (*attributes, children.contains_key(&self.attribute_section)),
            other => {
                return Err(TreeError::NotAContainer {
                    parent: self.path_of(node),
                    parent_kind: other.label(),
                    child: "attribute",
                })
            }
        };

        let section = match existing {
            Some(section) => section,
            None if shadowed => {
                return Err(TreeError::DuplicateName {
                    parent: self.path_of(node),
                    name: self.attribute_section.clone(),
                })
            }
            None => {
                let name = self.attribute_section.clone();
                let section = self.push(
                    &name,
                    Some(node),
                    NodeKind::KeyValue {
                        entries: Default::default(),
                    },
                );
                if let NodeKind::Path { attributes, .. } = &mut self.nodes[node.index()].kind {
                    *attributes = Some(section);
                }
                section
            }
        };

        let current = match &self.nodes[section.index()].kind {
            NodeKind::KeyValue { entries } => entries.get(key).copied(),
            _ => None,
        };
        match current {
            Some(id) => {
                self.set_value(id, value)?;
                Ok(id)
            }
            None => self.add_value(section, key, value),
        }
    }

    /// Replace the scalar of a `Value` node.
    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) -> Result<(), TreeError> {
        let path = self.path_of(node);
        match &mut self.node_mut(node)?.kind {
            NodeKind::Value { value: slot } => {
                *slot = value.into();
                Ok(())
            }
            other => Err(TreeError::NotAValue {
                path,
                kind: other.label(),
            }),
        }
    }

    /// Unlink the child called `name` from `parent`. The node stays in the
    /// arena but is no longer reachable. Returns `false` if there was no
    /// such child.
    pub fn detach(&mut self, parent: NodeId, name: &str) -> Result<bool, TreeError> {
        let nodes = &self.nodes;
        let named = |id: &NodeId| nodes[id.index()].name == name;
        let removed = match &self.node(parent)?.kind {
            NodeKind::Path { children, .. } => children.get(name).copied(),
            NodeKind::KeyValue { entries } => entries.get(name).copied(),
            NodeKind::ListValue { items } => items.iter().copied().find(|id| named(id)),
            NodeKind::ElementList { elements } => elements.iter().copied().find(|id| named(id)),
            _ => None,
        };
        let Some(removed) = removed else {
            return Ok(false);
        };

        match &mut self.nodes[parent.index()].kind {
            NodeKind::Path { children, .. } => {
                children.shift_remove(name);
            }
            NodeKind::KeyValue { entries } => {
                entries.shift_remove(name);
            }
            NodeKind::ListValue { items: ids } | NodeKind::ElementList { elements: ids } => {
                ids.retain(|id| *id != removed);
            }
            _ => {}
        }
        self.nodes[removed.index()].parent = None;
        Ok(true)
    }

    /// Absolute path of a node, with include wrappers substituted by the
    /// wrapped node. The root's path is the empty string.
    pub(crate) fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(node) = self.nodes.get(current.index()) {
            let Some(parent) = node.parent else {
                break;
            };
            // The include's own name stands for the wrapped node.
            let wrapped = matches!(self.nodes[parent.index()].kind, NodeKind::Include { .. });
            if !wrapped {
                segments.push(node.name.as_str());
            }
            current = parent;
        }
        segments.reverse();
        segments.join(&PATH_SEPARATOR.to_string())
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    fn push(&mut self, name: &str, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            kind,
        });
        id
    }

    fn attach(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId, TreeError> {
        check_name(name)?;
        let parent_kind = &self.node(parent)?.kind;
        let duplicate = match (parent_kind, &kind) {
            (
                NodeKind::Path {
                    children,
                    attributes,
                },
                _,
            ) => Some(
                children.contains_key(name)
                    || (attributes.is_some() && name == self.attribute_section),
            ),
            (NodeKind::KeyValue { entries }, NodeKind::Value { .. }) => {
                Some(entries.contains_key(name))
            }
            (NodeKind::ListValue { .. }, NodeKind::Value { .. })
            | (NodeKind::ElementList { .. }, NodeKind::Path { .. }) => Some(false),
            _ => None,
        };
        match duplicate {
            None => {
                return Err(TreeError::NotAContainer {
                    parent: self.path_of(parent),
                    parent_kind: parent_kind.label(),
                    child: kind.label(),
                })
            }
            Some(true) => {
                return Err(TreeError::DuplicateName {
                    parent: self.path_of(parent),
                    name: name.to_string(),
                })
            }
            Some(false) => {}
        }

        let id = self.push(name, Some(parent), kind);
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Path { children, .. } => {
                children.insert(name.to_string(), id);
            }
            NodeKind::KeyValue { entries } => {
                entries.insert(name.to_string(), id);
            }
            NodeKind::ListValue { items: ids } | NodeKind::ElementList { elements: ids } => {
                ids.push(id);
            }
            _ => {}
        }
        Ok(id)
    }

    /// Copy the subtree rooted at `src_id` of another tree under `parent`.
    fn graft(&mut self, src: &NodeTree, src_id: NodeId, parent: NodeId) -> NodeId {
        let src_node = &src.nodes[src_id.index()];
        let id = self.push(&src_node.name, Some(parent), NodeKind::empty_path());
        let kind = match &src_node.kind {
            NodeKind::Path {
                children,
                attributes,
            } => NodeKind::Path {
                children: children
                    .iter()
                    .map(|(name, child)| (name.clone(), self.graft(src, *child, id)))
                    .collect(),
                attributes: attributes.map(|section| self.graft(src, section, id)),
            },
            NodeKind::Value { value } => NodeKind::Value {
                value: value.clone(),
            },
            NodeKind::KeyValue { entries } => NodeKind::KeyValue {
                entries: entries
                    .iter()
                    .map(|(name, entry)| (name.clone(), self.graft(src, *entry, id)))
                    .collect(),
            },
            NodeKind::ListValue { items } => NodeKind::ListValue {
                items: items.iter().map(|item| self.graft(src, *item, id)).collect(),
            },
            NodeKind::ElementList { elements } => NodeKind::ElementList {
                elements: elements
                    .iter()
                    .map(|element| self.graft(src, *element, id))
                    .collect(),
            },
            NodeKind::Include { source, target } => NodeKind::Include {
                source: source.clone(),
                target: self.graft(src, *target, id),
            },
            NodeKind::Resource(resource) => NodeKind::Resource(resource.clone()),
        };
        self.nodes[id.index()].kind = kind;
        id
    }
}

fn check_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() {
        return Err(TreeError::EmptyName);
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}
