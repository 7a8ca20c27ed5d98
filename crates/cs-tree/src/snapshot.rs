//! Document fingerprints for diagnostics and cache comparisons.
//!
//! A snapshot hashes a canonical rendering of the tree, so two documents
//! with the same content produce the same fingerprint even when one of them
//! pulled a subtree in through an include.

use chrono::{DateTime, Utc};
use cs_common::{DocumentId, Version};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::Document;
use crate::node::NodeKind;
use crate::view::NodeRef;
use crate::walk::Visitor;

/// A frozen fingerprint of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// When this snapshot was taken.
    pub taken_at: DateTime<Utc>,

    pub document_name: String,

    pub document_id: DocumentId,

    pub version: Version,

    /// Nodes reachable from the root, includes resolved.
    pub node_count: usize,

    /// SHA-256 of the canonical tree rendering.
    pub tree_hash: String,

    /// SHA-256 over name, version and tree hash (for quick comparison).
    pub combined_hash: String,
}

impl DocumentSnapshot {
    pub fn capture(document: &Document) -> Self {
        let mut renderer = CanonicalRenderer::default();
        document.walk(&mut renderer);

        let tree_hash = hash_content(&renderer.out);
        let combined = format!("{}:{}:{}", document.name(), document.version(), tree_hash);

        DocumentSnapshot {
            taken_at: Utc::now(),
            document_name: document.name().to_string(),
            document_id: document.header().id(),
            version: document.version(),
            node_count: renderer.nodes,
            tree_hash,
            combined_hash: hash_content(&combined),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same name, version and content.
    pub fn matches(&self, other: &DocumentSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// First 12 chars of the combined hash.
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

#[derive(Default)]
struct CanonicalRenderer {
    out: String,
    nodes: usize,
}

impl Visitor for CanonicalRenderer {
    fn enter(&mut self, node: NodeRef<'_>, depth: usize) -> bool {
        use std::fmt::Write;

        self.nodes += 1;
        let kind = node.kind();
        let payload = match kind {
            NodeKind::Value { value } => value.clone(),
            NodeKind::Resource(resource) => format!(
                "{}|{}|{}",
                resource.kind, resource.resource_name, resource.location
            ),
            _ => String::new(),
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            self.out,
            "{}\t{}\t{}\t{}",
            depth,
            kind.label(),
            node.name(),
            payload.escape_default()
        );
        true
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::settings::Settings;
    use crate::tree::NodeTree;

    fn inline_doc() -> Document {
        let mut tree = NodeTree::new("root").unwrap();
        let root = tree.root();
        let shared = tree.add_path(root, "shared").unwrap();
        tree.add_value(shared, "level", "info").unwrap();
        Document::new(
            Header::new("cfg", Version::new(1, 0)),
            Settings::default(),
            tree,
        )
    }

    fn included_doc() -> Document {
        let mut part = NodeTree::new("shared").unwrap();
        let part_root = part.root();
        part.add_value(part_root, "level", "info").unwrap();

        let mut tree = NodeTree::new("root").unwrap();
        let root = tree.root();
        tree.add_include(root, "shared", "shared.xml", &part).unwrap();
        Document::new(
            Header::new("cfg", Version::new(1, 0)),
            Settings::default(),
            tree,
        )
    }

    #[test]
    fn test_include_does_not_change_fingerprint() {
        let a = DocumentSnapshot::capture(&inline_doc());
        let b = DocumentSnapshot::capture(&included_doc());
        assert_eq!(a.tree_hash, b.tree_hash);
        assert!(a.matches(&b));
        assert_eq!(a.node_count, 3);
    }

    #[test]
    fn test_value_change_changes_fingerprint() {
        let before = DocumentSnapshot::capture(&inline_doc());
        let mut doc = inline_doc();
        let level = doc.find("shared/level").unwrap().id();
        doc.tree_mut().set_value(level, "debug").unwrap();
        let after = DocumentSnapshot::capture(&doc);
        assert!(!before.matches(&after));
    }

    #[test]
    fn test_version_is_part_of_identity() {
        let a = DocumentSnapshot::capture(&inline_doc());
        let doc = inline_doc();
        let bumped = Document::new(
            Header::new("cfg", Version::new(1, 1)),
            doc.settings().clone(),
            doc.tree().clone(),
        );
        let b = DocumentSnapshot::capture(&bumped);
        assert_eq!(a.tree_hash, b.tree_hash);
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_short_id_and_json() {
        let snapshot = DocumentSnapshot::capture(&inline_doc());
        assert_eq!(snapshot.short_id().len(), 12);
        let json = snapshot.to_json().unwrap();
        let restored = DocumentSnapshot::from_json(&json).unwrap();
        assert!(snapshot.matches(&restored));
    }
}
