//! Parsed documents.

use cs_common::Version;

use crate::header::{Header, Stamp};
use crate::settings::Settings;
use crate::tree::NodeTree;
use crate::view::NodeRef;
use crate::walk::{walk, Visitor};

/// A parsed configuration document: header, section settings and node tree.
#[derive(Debug, Clone)]
pub struct Document {
    header: Header,
    settings: Settings,
    tree: NodeTree,
}

impl Document {
    pub fn new(header: Header, settings: Settings, tree: NodeTree) -> Self {
        Document {
            header,
            settings,
            tree,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Logical name from the header.
    pub fn name(&self) -> &str {
        self.header.name()
    }

    pub fn version(&self) -> Version {
        self.header.version()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Mutable access for edits made under the document's write lock.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.tree.root_ref()
    }

    /// Resolve a path from the root; an empty path yields the root.
    pub fn find(&self, path: &str) -> Option<NodeRef<'_>> {
        self.root().find(path)
    }

    /// Entry of the parameters section under the node at `path`.
    pub fn parameter(&self, path: &str, key: &str) -> Option<&str> {
        self.find(path)?.entry(&self.settings.parameters, key)
    }

    /// Entry of the properties section under the node at `path`.
    pub fn property(&self, path: &str, key: &str) -> Option<&str> {
        self.find(path)?.entry(&self.settings.properties, key)
    }

    /// Number of nodes reachable from the root, includes resolved.
    /// Detached nodes still held by the arena are not counted.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_: NodeRef<'_>, _: usize| {
            count += 1;
            true
        });
        count
    }

    /// Record a modification in the header.
    pub fn touch(&mut self, user: impl Into<String>) {
        self.header.modified_by = Some(Stamp::now(user));
    }

    /// Depth-first walk over the whole document.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        walk(self.root(), visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        let mut tree = NodeTree::new("root").unwrap();
        let root = tree.root();
        let params = tree.add_key_values(root, "parameters").unwrap();
        tree.add_value(params, "x", "1").unwrap();
        tree.add_value(params, "y", "2").unwrap();
        let db = tree.add_path(root, "db").unwrap();
        let props = tree.add_key_values(db, "props").unwrap();
        tree.add_value(props, "pool", "16").unwrap();

        let settings = Settings {
            properties: "props".to_string(),
            ..Settings::default()
        };
        Document::new(Header::new("cfg", Version::new(1, 0)), settings, tree)
    }

    #[test]
    fn test_find_parameter_values() {
        let doc = document();
        let x = doc.find("parameters/x").unwrap();
        assert_eq!(x.value(), Some("1"));
        assert!(doc.find("parameters/z").is_none());
        assert_eq!(doc.find(""), Some(doc.root()));
    }

    #[test]
    fn test_section_helpers_follow_settings() {
        let doc = document();
        assert_eq!(doc.parameter("", "y"), Some("2"));
        assert_eq!(doc.property("db", "pool"), Some("16"));
        assert_eq!(doc.property("", "pool"), None);
    }

    #[test]
    fn test_edits_and_touch() {
        let mut doc = document();
        let x = doc.find("parameters/x").unwrap().id();
        doc.tree_mut().set_value(x, "10").unwrap();
        doc.touch("admin");
        assert_eq!(doc.parameter("", "x"), Some("10"));
        assert_eq!(
            doc.header().modified_by.as_ref().map(|s| s.user.as_str()),
            Some("admin")
        );
    }

    #[test]
    fn test_node_count_skips_detached_nodes() {
        let mut doc = document();
        assert_eq!(doc.node_count(), 7);
        let root = doc.tree().root();
        assert!(doc.tree_mut().detach(root, "db").unwrap());
        assert_eq!(doc.node_count(), 4);
        assert_eq!(doc.tree().node_count(), 7);
    }
}
