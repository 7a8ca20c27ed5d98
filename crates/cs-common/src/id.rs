//! Document identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identity of a parsed document, assigned by the parser.
///
/// Two loads of the same file produce different ids; the store uses the
/// header name, not the id, as its cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub uuid::Uuid);

impl DocumentId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        DocumentId(uuid::Uuid::new_v4())
    }

    /// Parse an id from its hyphenated string form.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(DocumentId)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
