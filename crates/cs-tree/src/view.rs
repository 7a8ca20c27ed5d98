//! Borrowed node views.
//!
//! A [`NodeRef`] pairs a tree with a node id. Every accessor resolves
//! `Include` nodes to the node they wrap, so callers never see the include
//! indirection unless they ask for it with [`NodeRef::raw_kind`].

use std::fmt;

use crate::node::{Node, NodeId, NodeKind, ResourceRef};
use crate::tree::NodeTree;
use crate::PATH_SEPARATOR;

/// Read-only view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a NodeTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a NodeTree, id: NodeId) -> Self {
        NodeRef { tree, id }
    }

    fn node(&self) -> &'a Node {
        // Ids handed out by the tree always index into its arena.
        self.tree
            .get(self.id)
            .unwrap_or_else(|| unreachable!("dangling node id {}", self.id))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a NodeTree {
        self.tree
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Kind of the node after include resolution.
    pub fn kind(&self) -> &'a NodeKind {
        &self.resolve().node().kind
    }

    /// Kind of this exact node, `Include` wrappers included.
    pub fn raw_kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef::new(self.tree, id))
    }

    /// Absolute `/`-separated path from the root, used in error messages.
    pub fn path(&self) -> String {
        self.tree.path_of(self.id)
    }

    /// Follow `Include` wrappers to the node they stand for.
    pub fn resolve(&self) -> NodeRef<'a> {
        let mut current = *self;
        while let NodeKind::Include { target, .. } = current.node().kind {
            current = NodeRef::new(self.tree, target);
        }
        current
    }

    pub fn is_include(&self) -> bool {
        matches!(self.node().kind, NodeKind::Include { .. })
    }

    /// Scalar of a `Value` node.
    pub fn value(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Value { value } => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<&'a ResourceRef> {
        match self.kind() {
            NodeKind::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Scalars of a `ListValue` node, in document order.
    pub fn values(&self) -> Vec<&'a str> {
        match self.kind() {
            NodeKind::ListValue { .. } => self.children().filter_map(|item| item.value()).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the node has no children. Leaves are always empty.
    pub fn is_empty(&self) -> bool {
        self.children().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.children().count()
    }

    /// Live children in document order, includes resolved.
    pub fn children(&self) -> Children<'a> {
        let ids = match self.kind() {
            NodeKind::Path { children, .. } => ChildIds::Map(children.values()),
            NodeKind::KeyValue { entries } => ChildIds::Map(entries.values()),
            NodeKind::ListValue { items } => ChildIds::Seq(items.iter()),
            NodeKind::ElementList { elements } => ChildIds::Seq(elements.iter()),
            NodeKind::Value { .. } | NodeKind::Resource(_) | NodeKind::Include { .. } => {
                ChildIds::Empty
            }
        };
        Children {
            tree: self.tree,
            ids,
        }
    }

    /// Direct child by name. For lists the first item with that name wins;
    /// on `Path` nodes the attribute section is reachable by its name.
    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        let this = self.resolve();
        let named = |id: &NodeId| {
            self.tree
                .get(*id)
                .map(|node| node.name == name)
                .unwrap_or(false)
        };
        let id = match this.kind() {
            NodeKind::Path {
                children,
                attributes,
            } => children
                .get(name)
                .copied()
                .or_else(|| attributes.filter(named)),
            NodeKind::KeyValue { entries } => entries.get(name).copied(),
            NodeKind::ListValue { items } => items.iter().copied().find(named),
            NodeKind::ElementList { elements } => elements.iter().copied().find(named),
            NodeKind::Value { .. } | NodeKind::Resource(_) | NodeKind::Include { .. } => None,
        }?;
        Some(NodeRef::new(self.tree, id).resolve())
    }

    /// Resolve a `/`-delimited path one level per segment. Empty segments
    /// are ignored, so `""` and `"/"` resolve to this node.
    pub fn find(&self, path: &str) -> Option<NodeRef<'a>> {
        path.split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .try_fold(self.resolve(), |node, segment| node.child(segment))
    }

    /// The attribute section of a `Path` node.
    pub fn attributes(&self) -> Option<NodeRef<'a>> {
        match self.kind() {
            NodeKind::Path {
                attributes: Some(section),
                ..
            } => Some(NodeRef::new(self.tree, *section)),
            _ => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes()?.child(key)?.value()
    }

    /// A `KeyValue` child such as the parameters or properties section.
    pub fn section(&self, section: &str) -> Option<NodeRef<'a>> {
        let node = self.child(section)?;
        matches!(node.kind(), NodeKind::KeyValue { .. }).then_some(node)
    }

    /// One entry of a `KeyValue` section.
    pub fn entry(&self, section: &str, key: &str) -> Option<&'a str> {
        self.section(section)?.child(key)?.value()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("kind", &self.raw_kind().label())
            .finish()
    }
}

enum ChildIds<'a> {
    Map(indexmap::map::Values<'a, String, NodeId>),
    Seq(std::slice::Iter<'a, NodeId>),
    Empty,
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a NodeTree,
    ids: ChildIds<'a>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = match &mut self.ids {
            ChildIds::Map(values) => values.next()?,
            ChildIds::Seq(iter) => iter.next()?,
            ChildIds::Empty => return None,
        };
        Some(NodeRef::new(self.tree, *id).resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> NodeTree {
        let mut tree = NodeTree::new("root").unwrap();
        let root = tree.root();
        let params = tree.add_key_values(root, "parameters").unwrap();
        tree.add_value(params, "x", "1").unwrap();
        tree.add_value(params, "y", "2").unwrap();
        let server = tree.add_path(root, "server").unwrap();
        tree.set_attribute(server, "port", "8080").unwrap();
        let workers = tree.add_element_list(server, "workers").unwrap();
        let first = tree.add_element(workers, "worker").unwrap();
        tree.add_value(first, "threads", "4").unwrap();
        let second = tree.add_element(workers, "worker").unwrap();
        tree.add_value(second, "threads", "8").unwrap();
        tree
    }

    #[test]
    fn test_find_parameters() {
        let tree = sample();
        let root = tree.root_ref();
        let x = root.find("parameters/x").unwrap();
        assert_eq!(x.value(), Some("1"));
        assert!(matches!(x.kind(), NodeKind::Value { .. }));
        assert!(root.find("parameters/z").is_none());
        assert!(root.find("missing/x").is_none());
    }

    #[test]
    fn test_find_ignores_extra_separators() {
        let tree = sample();
        let root = tree.root_ref();
        assert_eq!(root.find(""), Some(root));
        assert_eq!(root.find("/"), Some(root));
        assert_eq!(
            root.find("/parameters//y/").and_then(|n| n.value()),
            Some("2")
        );
    }

    #[test]
    fn test_element_lists_keep_order() {
        let tree = sample();
        let workers = tree.root_ref().find("server/workers").unwrap();
        let threads: Vec<_> = workers
            .children()
            .filter_map(|w| w.child("threads").and_then(|t| t.value()))
            .collect();
        assert_eq!(threads, vec!["4", "8"]);
        // Name lookup picks the first element
        assert_eq!(
            workers.find("worker/threads").and_then(|t| t.value()),
            Some("4")
        );
    }

    #[test]
    fn test_attributes_reachable_by_section_name() {
        let tree = sample();
        let root = tree.root_ref();
        assert_eq!(root.find("server").unwrap().attribute("port"), Some("8080"));
        assert_eq!(
            root.find("server/attributes/port").and_then(|n| n.value()),
            Some("8080")
        );
    }

    #[test]
    fn test_paths_and_parents() {
        let tree = sample();
        let threads = tree.root_ref().find("server/workers/worker/threads").unwrap();
        assert_eq!(threads.path(), "server/workers/worker/threads");
        assert_eq!(threads.parent().unwrap().name(), "worker");
        assert!(tree.root_ref().parent().is_none());
    }

    #[test]
    fn test_sections_and_entries() {
        let tree = sample();
        let root = tree.root_ref();
        assert_eq!(root.entry("parameters", "y"), Some("2"));
        assert!(root.section("server").is_none());
        assert!(root.section("properties").is_none());
    }

    #[test]
    fn test_is_empty() {
        let mut tree = NodeTree::new("root").unwrap();
        assert!(tree.root_ref().is_empty());
        let root = tree.root();
        tree.add_path(root, "child").unwrap();
        assert!(!tree.root_ref().is_empty());
        assert_eq!(tree.root_ref().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_every_added_path_is_found(segments in proptest::collection::vec("[a-z]{1,6}", 1..6)) {
            let mut tree = NodeTree::new("root").unwrap();
            let mut parent = tree.root();
            for segment in &segments {
                parent = tree.add_path(parent, segment).unwrap();
            }
            let path = segments.join("/");
            let found = tree.root_ref().find(&path);
            prop_assert!(found.is_some());
            prop_assert_eq!(found.unwrap().path(), path);
        }

        #[test]
        fn prop_missing_segment_is_absent(segments in proptest::collection::vec("[a-z]{1,6}", 1..6)) {
            let mut tree = NodeTree::new("root").unwrap();
            let mut parent = tree.root();
            for segment in &segments {
                parent = tree.add_path(parent, segment).unwrap();
            }
            let path = format!("{}/NOPE", segments.join("/"));
            prop_assert!(tree.root_ref().find(&path).is_none());
        }
    }
}
