//! Document header metadata.

use chrono::{DateTime, Utc};
use cs_common::{DocumentId, Version};
use serde::{Deserialize, Serialize};

/// Who touched a document, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub user: String,
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn now(user: impl Into<String>) -> Self {
        Stamp {
            user: user.into(),
            at: Utc::now(),
        }
    }
}

/// Header of a parsed document.
///
/// `id`, `name`, `version` and `timestamp` are fixed by the parser when the
/// header is built and only exposed through getters afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    id: DocumentId,
    name: String,
    version: Version,
    timestamp: DateTime<Utc>,

    #[serde(default)]
    pub application_group: Option<String>,

    #[serde(default)]
    pub application: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub created_by: Option<Stamp>,

    #[serde(default)]
    pub modified_by: Option<Stamp>,
}

impl Header {
    /// Header with a fresh id and the current time as timestamp.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Header {
            id: DocumentId::new(),
            name: name.into(),
            version,
            timestamp: Utc::now(),
            application_group: None,
            application: None,
            description: None,
            created_by: None,
            modified_by: None,
        }
    }

    /// Keep the id recorded in the source document.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    /// Keep the timestamp recorded in the source document.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_application(
        mut self,
        group: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        self.application_group = Some(group.into());
        self.application = Some(application.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created_by(mut self, stamp: Stamp) -> Self {
        self.created_by = Some(stamp);
        self
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Logical name; the store's cache key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_identity() {
        let id = DocumentId::new();
        let header = Header::new("app", Version::new(2, 1))
            .with_id(id)
            .with_application("payments", "gateway")
            .with_description("gateway settings")
            .with_created_by(Stamp::now("ops"));

        assert_eq!(header.id(), id);
        assert_eq!(header.name(), "app");
        assert_eq!(header.version(), Version::new(2, 1));
        assert_eq!(header.application.as_deref(), Some("gateway"));
        assert_eq!(header.created_by.as_ref().map(|s| s.user.as_str()), Some("ops"));
        assert!(header.modified_by.is_none());
    }

    #[test]
    fn test_header_json_roundtrip() {
        let header = Header::new("app", Version::new(1, 0)).with_description("d");
        let json = serde_json::to_string(&header).unwrap();
        assert!(json.contains("\"version\":\"1.0\""));
        let back: Header = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), header.id());
        assert_eq!(back.timestamp(), header.timestamp());
    }
}
