use super::request::{BulkRequest, OperationType};
use super::response::{BulkItemResult, BulkResultSet, ElasticSearchBulkResponse};
use crate::error::{Error, Result};
use crate::result::OperationResult;
use crate::routes::DocumentPath;
use crate::transport::{EngineRequest, EngineTransport};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An operation that passed validation and will be sent to the engine.
#[derive(Debug, Clone, PartialEq)]
struct PreparedOperation {
    op_type: OperationType,
    path: DocumentPath,
    version: Option<u64>,
    document: Option<Value>,
}

/// Slot of the caller's batch: either sent to the engine, or rejected
/// locally with a reason.
#[derive(Debug)]
enum Entry {
    Send(PreparedOperation),
    Rejected {
        op_type: OperationType,
        url: String,
        reason: String,
    },
}

/// Validates a batch, sends it as one `_bulk` call and correlates the
/// per-item outcomes back to the caller's order.
pub struct BulkOrchestrator {
    transport: Arc<dyn EngineTransport>,
    url_prefix: String,
}

impl BulkOrchestrator {
    pub fn new(transport: Arc<dyn EngineTransport>, url_prefix: impl Into<String>) -> Self {
        Self {
            transport,
            url_prefix: url_prefix.into(),
        }
    }

    /// Run a batch. Never fails: every error becomes part of the result.
    ///
    /// An undefined request anywhere in the batch aborts it before anything
    /// is sent. Entries with a bad URL, a missing document or a non-numeric
    /// etag are reported as 400 items while the rest of the batch proceeds.
    pub async fn perform(&self, requests: &[BulkRequest]) -> OperationResult {
        match self.try_perform(requests).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error_type = e.error_type(), "bulk operation failed: {}", e);
                e.into()
            }
        }
    }

    async fn try_perform(&self, requests: &[BulkRequest]) -> Result<OperationResult> {
        for (position, request) in requests.iter().enumerate() {
            request.validate().map_err(|e| match e {
                Error::InvalidRequest(reason) => {
                    Error::InvalidRequest(format!("bulk request {}: {}", position, reason))
                }
                other => other,
            })?;
        }

        let entries: Vec<Entry> = requests.iter().map(prepare).collect::<Result<_>>()?;
        let to_send: Vec<&PreparedOperation> = entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Send(op) => Some(op),
                Entry::Rejected { .. } => None,
            })
            .collect();

        let mut outcomes = Vec::new();
        if !to_send.is_empty() {
            let body = to_ndjson(&to_send)?;
            debug!("sending {} bulk operations", to_send.len());

            let response = self
                .transport
                .send(EngineRequest::post("_bulk").ndjson(body))
                .await?;
            if !response.is_success() {
                return Ok(OperationResult::from_engine(response.status, &response.body));
            }

            let parsed: ElasticSearchBulkResponse = serde_json::from_str(&response.body)
                .map_err(|e| Error::Engine {
                    status: 502,
                    reason: format!("unparseable bulk response: {}", e),
                })?;
            if parsed.items.len() != to_send.len() {
                return Err(Error::Engine {
                    status: 502,
                    reason: format!(
                        "bulk response has {} items for {} operations",
                        parsed.items.len(),
                        to_send.len()
                    ),
                });
            }
            outcomes = parsed.items;
        }

        let mut outcomes = outcomes.into_iter();
        let mut results = Vec::with_capacity(entries.len());
        for entry in &entries {
            let item = match entry {
                Entry::Rejected {
                    op_type,
                    url,
                    reason,
                } => BulkItemResult::new(*op_type, url.clone(), None, 400, reason.clone()),
                Entry::Send(op) => {
                    let outcome = outcomes.next();
                    self.item_result(op, outcome.as_ref().and_then(|o| o.status()))
                }
            };
            results.push(item);
        }

        let set = BulkResultSet::new(results);
        let body = serde_json::to_string(&set)?;
        info!(
            "bulk finished: {} of {} operations succeeded",
            set.total_success, set.total_operations
        );

        if set.all_succeeded() {
            Ok(OperationResult::success(200, Some(body)))
        } else {
            let code = set.worst_status().unwrap_or(500);
            Ok(OperationResult::failure(
                code,
                format!(
                    "{} of {} bulk operations succeeded",
                    set.total_success, set.total_operations
                ),
            )
            .with_result(body))
        }
    }

    fn item_result(
        &self,
        op: &PreparedOperation,
        status: Option<&super::response::ElasticSearchOperationStatus>,
    ) -> BulkItemResult {
        let Some(status) = status else {
            return BulkItemResult::new(
                op.op_type,
                op.path.to_url(&self.url_prefix),
                None,
                500,
                "engine returned no status for operation",
            );
        };

        let path = DocumentPath {
            index: if status.index.is_empty() {
                op.path.index.clone()
            } else {
                status.index.clone()
            },
            id: if status.id.is_empty() {
                op.path.id.clone()
            } else {
                Some(status.id.clone())
            },
        };

        let message = if status.is_success() {
            "OK".to_string()
        } else {
            status
                .error
                .as_ref()
                .map(|e| e.reason.clone())
                .unwrap_or_default()
        };
        if !status.is_success() {
            warn!(
                "bulk {} on {}/{:?} failed with {}: {}",
                op.op_type, path.index, path.id, status.status, message
            );
        }

        BulkItemResult::new(
            op.op_type,
            path.to_url(&self.url_prefix),
            status.version.map(|v| v.to_string()),
            status.status,
            message,
        )
    }
}

fn prepare(request: &BulkRequest) -> Result<Entry> {
    let (op_type, operation) = match (request.operation_type(), request.operation()) {
        (Some(t), Some(op)) => (t, op),
        _ => return Err(Error::InvalidRequest("undefined bulk operation".into())),
    };
    let url = operation.meta_data.url.clone();
    let reject = |reason: String| Entry::Rejected {
        op_type,
        url: url.clone(),
        reason,
    };

    let path = match DocumentPath::parse(&url) {
        Ok(path) => path,
        Err(e) => return Ok(reject(e.to_string())),
    };
    if path.id.is_none() && op_type != OperationType::Create {
        return Ok(reject(format!("{} requires a document id in the URL", op_type)));
    }

    let version = match operation.meta_data.etag.as_deref().filter(|e| !e.is_empty()) {
        Some(etag) if op_type != OperationType::Create => match etag.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => return Ok(reject(format!("etag '{}' is not a document version", etag))),
        },
        _ => None,
    };

    let document = match op_type {
        OperationType::Delete => None,
        _ => match &operation.document {
            Some(doc @ Value::Object(_)) => Some(doc.clone()),
            Some(_) => return Ok(reject("document must be a JSON object".into())),
            None => return Ok(reject(format!("{} requires a document", op_type))),
        },
    };

    Ok(Entry::Send(PreparedOperation {
        op_type,
        path,
        version,
        document,
    }))
}

/// Serialise operations into the engine's newline-delimited bulk body.
fn to_ndjson(operations: &[&PreparedOperation]) -> Result<String> {
    let mut body = String::new();
    for op in operations {
        let mut meta = Map::new();
        meta.insert("_index".into(), json!(op.path.index));
        if let Some(ref id) = op.path.id {
            meta.insert("_id".into(), json!(id));
        }
        if let Some(version) = op.version {
            meta.insert("version".into(), json!(version));
        }

        let action = match op.op_type {
            OperationType::Create => "create",
            OperationType::Update => "index",
            OperationType::Delete => "delete",
        };
        let mut line = Map::new();
        line.insert(action.to_string(), Value::Object(meta));
        body.push_str(&serde_json::to_string(&line)?);
        body.push('\n');

        if let Some(ref document) = op.document {
            body.push_str(&serde_json::to_string(document)?);
            body.push('\n');
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::request::BulkOperation;

    fn prepared(request: BulkRequest) -> PreparedOperation {
        match prepare(&request).unwrap() {
            Entry::Send(op) => op,
            Entry::Rejected { reason, .. } => panic!("rejected: {}", reason),
        }
    }

    #[test]
    fn test_ndjson_layout() {
        let create = prepared(BulkRequest::create(BulkOperation::new(
            "/indexes/orders/documents/1",
            Some(json!({"total": 5})),
        )));
        let update = prepared(BulkRequest::update(
            BulkOperation::new("/indexes/orders/documents/2", Some(json!({"total": 7})))
                .with_etag("3"),
        ));
        let delete = prepared(BulkRequest::delete(
            BulkOperation::new("/indexes/orders/documents/3", None).with_etag("1"),
        ));

        let body = to_ndjson(&[&create, &update, &delete]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"create":{"_index":"orders","_id":"1"}}"#,
                r#"{"total":5}"#,
                r#"{"index":{"_index":"orders","_id":"2","version":3}}"#,
                r#"{"total":7}"#,
                r#"{"delete":{"_index":"orders","_id":"3","version":1}}"#,
            ]
        );
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_encoded_ids_are_sent_decoded() {
        let delete = prepared(BulkRequest::delete(BulkOperation::new(
            "/indexes/orders/documents/a%2Fb",
            None,
        )));
        let body = to_ndjson(&[&delete]).unwrap();
        assert_eq!(body, "{\"delete\":{\"_index\":\"orders\",\"_id\":\"a/b\"}}\n");
    }

    #[test]
    fn test_create_without_id_is_allowed() {
        let op = prepared(BulkRequest::create(BulkOperation::new(
            "/indexes/orders/documents/",
            Some(json!({})),
        )));
        assert!(op.path.id.is_none());
    }

    #[test]
    fn test_entry_level_rejections() {
        let cases = [
            BulkRequest::update(BulkOperation::new("/not/a/document/url", Some(json!({})))),
            BulkRequest::delete(BulkOperation::new("/indexes/orders", None)),
            BulkRequest::update(BulkOperation::new("/indexes/o/documents/1", None)),
            BulkRequest::update(
                BulkOperation::new("/indexes/o/documents/1", Some(json!({}))).with_etag("abc"),
            ),
            BulkRequest::create(BulkOperation::new("/indexes/o/documents/1", Some(json!([1])))),
        ];
        for request in cases {
            assert!(
                matches!(prepare(&request).unwrap(), Entry::Rejected { .. }),
                "accepted {:?}",
                request
            );
        }
    }
}
