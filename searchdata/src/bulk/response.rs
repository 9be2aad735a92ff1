//! Engine `_bulk` response types and the per-item result handed to callers

use super::request::OperationType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Engine `_bulk` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticSearchBulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<ElasticSearchResultItem>,
}

/// One item of a `_bulk` response. Exactly one slot is populated, matching
/// the action that was sent (`index` is what an update is sent as).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElasticSearchResultItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<ElasticSearchOperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<ElasticSearchOperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<ElasticSearchOperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<ElasticSearchOperationStatus>,
}

impl ElasticSearchResultItem {
    pub fn status(&self) -> Option<&ElasticSearchOperationStatus> {
        self.create
            .as_ref()
            .or(self.index.as_ref())
            .or(self.update.as_ref())
            .or(self.delete.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticSearchOperationStatus {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(rename = "_shards", default, skip_serializing_if = "Option::is_none")]
    pub shards: Option<ElasticSearchShardStatus>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ElasticSearchError>,
    /// Fields this crate does not model, kept verbatim
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl ElasticSearchOperationStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElasticSearchShardStatus {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticSearchError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// Per-operation outcome reported to the caller.
///
/// Deletes never carry an `etag`: no version is exposed for a removed
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub operation: OperationType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(rename = "status-code")]
    pub status_code: String,
    #[serde(rename = "status-message")]
    pub status_message: String,
}

impl BulkItemResult {
    pub fn new(
        operation: OperationType,
        url: impl Into<String>,
        version: Option<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        let etag = match operation {
            OperationType::Delete => None,
            OperationType::Create | OperationType::Update => Some(version.unwrap_or_default()),
        };
        Self {
            operation,
            url: url.into(),
            etag,
            status_code: status.to_string(),
            status_message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status_code.parse().unwrap_or(500)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status())
    }
}

/// Batch summary returned as the bulk `OperationResult` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResultSet {
    pub total_operations: usize,
    pub total_success: usize,
    pub results: Vec<BulkItemResult>,
}

impl BulkResultSet {
    pub fn new(results: Vec<BulkItemResult>) -> Self {
        Self {
            total_operations: results.len(),
            total_success: results.iter().filter(|r| r.is_success()).count(),
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.total_success == self.total_operations
    }

    /// Highest status code among failed items.
    pub fn worst_status(&self) -> Option<u16> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .map(BulkItemResult::status)
            .max()
    }
}
