//! Format settings: the names under which special sections are attached.

use serde::{Deserialize, Serialize};

/// Section names used by a document format.
///
/// Parameters and properties are both `KeyValue` nodes; only the name they
/// are attached under tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parameters: String,
    pub properties: String,
    pub attributes: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            parameters: "parameters".to_string(),
            properties: "properties".to_string(),
            attributes: crate::tree::DEFAULT_ATTRIBUTE_SECTION.to_string(),
        }
    }
}
