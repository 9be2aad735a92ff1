//! Document entity exchanged with callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document together with its identity and revision.
///
/// As input to create/update/delete the `etag` is the expected revision; as
/// output it is the revision the engine reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl Document {
    pub fn new(content: Value) -> Self {
        Self {
            id: None,
            etag: None,
            url: None,
            content,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Id if set and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref().filter(|s| !s.is_empty())
    }
}
