//! Caller-side bulk request model
//!
//! A batch is a JSON array of requests, each holding exactly one of
//! `create`, `update` or `delete`:
//!
//! ```json
//! [
//!   {"create": {"metaData": {"url": ".../indexes/orders/documents/1"}, "document": {...}}},
//!   {"update": {"metaData": {"url": ".../indexes/orders/documents/2", "etag": "4"}, "document": {...}}},
//!   {"delete": {"metaData": {"url": ".../indexes/orders/documents/3", "etag": "1"}}}
//! ]
//! ```

use crate::error::{Error, Result};
use crate::routes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkMetaData {
    pub url: String,
    /// Expected document version for update/delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    #[serde(rename = "metaData")]
    pub meta_data: BulkMetaData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
}

impl BulkOperation {
    pub fn new(url: impl Into<String>, document: Option<Value>) -> Self {
        Self {
            meta_data: BulkMetaData {
                url: url.into(),
                etag: None,
            },
            document,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.meta_data.etag = Some(etag.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<BulkOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<BulkOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<BulkOperation>,
}

impl BulkRequest {
    pub fn create(operation: BulkOperation) -> Self {
        Self {
            create: Some(operation),
            ..Default::default()
        }
    }

    pub fn update(operation: BulkOperation) -> Self {
        Self {
            update: Some(operation),
            ..Default::default()
        }
    }

    pub fn delete(operation: BulkOperation) -> Self {
        Self {
            delete: Some(operation),
            ..Default::default()
        }
    }

    /// Type of the single populated slot; `None` when no slot, or more than
    /// one, is populated.
    pub fn operation_type(&self) -> Option<OperationType> {
        match (&self.create, &self.update, &self.delete) {
            (Some(_), None, None) => Some(OperationType::Create),
            (None, Some(_), None) => Some(OperationType::Update),
            (None, None, Some(_)) => Some(OperationType::Delete),
            _ => None,
        }
    }

    pub fn operation(&self) -> Option<&BulkOperation> {
        match self.operation_type()? {
            OperationType::Create => self.create.as_ref(),
            OperationType::Update => self.update.as_ref(),
            OperationType::Delete => self.delete.as_ref(),
        }
    }

    /// Index named by the operation's URL.
    pub fn index(&self) -> Option<String> {
        self.operation()
            .and_then(|op| routes::index_token(&op.meta_data.url))
    }

    /// Document id named by the operation's URL.
    pub fn id(&self) -> Option<String> {
        self.operation().and_then(|op| routes::id_token(&op.meta_data.url))
    }

    /// Fails unless exactly one slot is populated.
    pub fn validate(&self) -> Result<()> {
        let populated = [&self.create, &self.update, &self.delete]
            .iter()
            .filter(|slot| slot.is_some())
            .count();
        match populated {
            1 => Ok(()),
            0 => Err(Error::InvalidRequest("undefined bulk operation".into())),
            _ => Err(Error::InvalidRequest(
                "bulk request holds more than one operation".into(),
            )),
        }
    }
}

/// Parse a caller-supplied batch.
pub fn parse_bulk_requests(json: &str) -> Result<Vec<BulkRequest>> {
    serde_json::from_str(json)
        .map_err(|e| Error::InvalidRequest(format!("malformed bulk request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_type_per_slot() {
        let create = BulkRequest::create(BulkOperation::new("/test/indexes/index1", None));
        assert_eq!(create.operation_type(), Some(OperationType::Create));
        assert_eq!(create.index().as_deref(), Some("index1"));

        let update = BulkRequest::update(BulkOperation::new("/test/documents/document1", None));
        assert_eq!(update.operation_type(), Some(OperationType::Update));
        assert_eq!(update.id().as_deref(), Some("document1"));

        let delete = BulkRequest::delete(BulkOperation::new("/test/indexes/a/documents/b", None));
        assert_eq!(delete.operation_type(), Some(OperationType::Delete));
        assert_eq!(delete.index().as_deref(), Some("a"));
        assert_eq!(delete.id().as_deref(), Some("b"));
    }

    #[test]
    fn test_undefined_request() {
        let request = BulkRequest::default();
        assert_eq!(request.operation_type(), None);
        assert!(request.index().is_none());
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: undefined bulk operation");
    }

    #[test]
    fn test_two_slots_rejected() {
        let request = BulkRequest {
            create: Some(BulkOperation::new("/indexes/a/documents/1", None)),
            delete: Some(BulkOperation::new("/indexes/a/documents/1", None)),
            ..Default::default()
        };
        assert_eq!(request.operation_type(), None);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_parse_batch() {
        let batch = json!([
            {"create": {"metaData": {"url": "/indexes/a/documents/1"}, "document": {"f": 1}}},
            {"update": {"metaData": {"url": "/indexes/a/documents/2", "etag": "4"}, "document": {"f": 2}}},
            {"delete": {"metaData": {"url": "/indexes/a/documents/3", "etag": "1"}}}
        ]);
        let requests = parse_bulk_requests(&batch.to_string()).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].update.as_ref().unwrap().meta_data.etag.as_deref(), Some("4"));
        assert_eq!(requests[2].operation_type(), Some(OperationType::Delete));
    }

    #[test]
    fn test_parse_malformed_batch() {
        assert!(matches!(
            parse_bulk_requests("[{\"create\": 5}]"),
            Err(Error::InvalidRequest(_))
        ));
    }
}
