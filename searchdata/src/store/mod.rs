//! Document store facade
//!
//! [`DocumentStore`] is the entry point callers use: index lifecycle,
//! single-document verbs, search and bulk. Every operation returns a result
//! envelope; engine and transport failures are folded into it rather than
//! returned as `Err`.

mod response;

use crate::authz::{Authorizer, PermitAll};
use crate::bulk::{BulkOrchestrator, BulkRequest};
use crate::config::ElasticSearchConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::result::{
    DocumentOperationResult, ErrorDetail, OperationResult, SearchOperationResult,
};
use crate::routes::DocumentPath;
use crate::schema::{generate_document_mappings, translate_es_payload, DocumentSchema, IndexSettings};
use crate::transport::{EngineRequest, EngineResponse, EngineTransport, HttpTransport};
use response::{decompose_search, DocumentReply};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub struct DocumentStore {
    config: ElasticSearchConfig,
    transport: Arc<dyn EngineTransport>,
    settings: OnceCell<IndexSettings>,
    authorizer: Arc<dyn Authorizer>,
}

impl DocumentStore {
    /// Store backed by an HTTP(S) transport built from `config`.
    pub fn new(config: ElasticSearchConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ElasticSearchConfig, transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            config,
            transport,
            settings: OnceCell::new(),
            authorizer: Arc::new(PermitAll),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn config(&self) -> &ElasticSearchConfig {
        &self.config
    }

    /// Index settings, loaded from the configured files on first use.
    ///
    /// Concurrent first callers wait on a single load. A failed load is not
    /// cached, so the next call retries.
    pub async fn index_settings(&self) -> Result<&IndexSettings> {
        self.settings
            .get_or_try_init(|| async {
                let settings = IndexSettings::load(
                    self.config.settings_file.as_deref(),
                    self.config.analysis_file.as_deref(),
                    self.config.filter_file.as_deref(),
                )?;
                info!(
                    "Loaded index settings ({})",
                    if settings.is_empty() { "empty" } else { "custom" }
                );
                Ok::<_, Error>(settings)
            })
            .await
    }

    /// Whether `subject` may call `function`. Always true when authorization
    /// is disabled.
    pub async fn is_authorized(&self, subject: &str, function: &str) -> bool {
        if !self.config.authorization_enabled {
            return true;
        }
        let decision = self.authorizer.authorize(subject, function).await;
        if !decision.is_allowed() {
            info!("Denied {} for {}", function, subject);
        }
        decision.is_allowed()
    }

    /// Create `index` with mappings generated from `schema` and the
    /// configured index settings.
    pub async fn create_index(&self, index: &str, schema: &DocumentSchema) -> OperationResult {
        fold("create_index", self.try_create_index(index, schema).await)
    }

    async fn try_create_index(&self, index: &str, schema: &DocumentSchema) -> Result<OperationResult> {
        check_index(index)?;
        schema.validate()?;
        let mappings = generate_document_mappings(schema)?;
        let payload = self.index_settings().await?.index_payload(mappings);

        let response = self
            .send(EngineRequest::put(encode_segment(index)).json(payload.to_string()))
            .await?;
        if response.is_success() {
            info!("Created index {}", index);
        }
        Ok(OperationResult::from_engine(response.status, &response.body))
    }

    /// Create `index` from a raw engine payload, migrating legacy field
    /// options first.
    pub async fn create_index_from_payload(&self, index: &str, payload: &str) -> OperationResult {
        fold(
            "create_index_from_payload",
            self.try_create_index_from_payload(index, payload).await,
        )
    }

    async fn try_create_index_from_payload(&self, index: &str, payload: &str) -> Result<OperationResult> {
        check_index(index)?;
        let translated = translate_es_payload(payload)?;
        debug!("Translated index payload for {}: {}", index, translated);

        let response = self
            .send(EngineRequest::put(encode_segment(index)).json(translated))
            .await?;
        if response.is_success() {
            info!("Created index {} from payload", index);
        }
        Ok(OperationResult::from_engine(response.status, &response.body))
    }

    pub async fn delete_index(&self, index: &str) -> OperationResult {
        fold("delete_index", self.try_delete_index(index).await)
    }

    async fn try_delete_index(&self, index: &str) -> Result<OperationResult> {
        check_index(index)?;
        let response = self.send(EngineRequest::delete(encode_segment(index))).await?;
        if response.is_success() {
            info!("Deleted index {}", index);
        }
        Ok(OperationResult::from_engine(response.status, &response.body))
    }

    /// 200 when the index exists, 404 when it does not.
    pub async fn index_exists(&self, index: &str) -> OperationResult {
        fold("index_exists", self.try_index_exists(index).await)
    }

    async fn try_index_exists(&self, index: &str) -> Result<OperationResult> {
        check_index(index)?;
        let response = self.send(EngineRequest::head(encode_segment(index))).await?;
        Ok(match response.status {
            404 => OperationResult::failure(404, format!("index {} does not exist", index)),
            status => OperationResult::from_engine(status, &response.body),
        })
    }

    /// Create a document. Without an id the engine assigns one; with an id
    /// an existing document of that id is a 409 conflict.
    pub async fn create_document(&self, index: &str, document: &Document) -> DocumentOperationResult {
        fold("create_document", self.try_create_document(index, document).await)
    }

    async fn try_create_document(&self, index: &str, document: &Document) -> Result<DocumentOperationResult> {
        check_index(index)?;
        let body = document_body(document)?;

        let request = match document.id() {
            Some(id) => EngineRequest::put(format!(
                "{}/_doc/{}?op_type=create",
                encode_segment(index),
                encode_segment(id)
            )),
            None => EngineRequest::post(format!("{}/_doc", encode_segment(index))),
        };
        let response = self.send(request.json(body)).await?;
        self.document_result(index, document.id(), Some(&document.content), response)
    }

    /// Replace a document. A supplied etag must match the stored version.
    pub async fn update_document(&self, index: &str, document: &Document) -> DocumentOperationResult {
        fold("update_document", self.try_update_document(index, document).await)
    }

    async fn try_update_document(&self, index: &str, document: &Document) -> Result<DocumentOperationResult> {
        check_index(index)?;
        let id = require_id(document, "update")?;
        let body = document_body(document)?;

        let path = format!(
            "{}/_doc/{}{}",
            encode_segment(index),
            encode_segment(id),
            version_query(document.etag())?
        );
        let response = self.send(EngineRequest::put(path).json(body)).await?;
        self.document_result(index, Some(id), Some(&document.content), response)
    }

    /// Delete a document. A supplied etag must match the stored version.
    /// The result never carries a version.
    pub async fn delete_document(&self, index: &str, document: &Document) -> DocumentOperationResult {
        fold("delete_document", self.try_delete_document(index, document).await)
    }

    async fn try_delete_document(&self, index: &str, document: &Document) -> Result<DocumentOperationResult> {
        check_index(index)?;
        let id = require_id(document, "delete")?;

        let path = format!(
            "{}/_doc/{}{}",
            encode_segment(index),
            encode_segment(id),
            version_query(document.etag())?
        );
        let response = self.send(EngineRequest::delete(path)).await?;
        if !response.is_success() {
            return Ok(DocumentOperationResult::new(
                document_failure(response.status, &response.body),
                None,
            ));
        }
        info!("Deleted document {}/{}", index, id);
        Ok(DocumentOperationResult::new(
            OperationResult::success(response.status, None),
            None,
        ))
    }

    pub async fn get_document(&self, index: &str, id: &str) -> DocumentOperationResult {
        fold("get_document", self.try_get_document(index, id).await)
    }

    async fn try_get_document(&self, index: &str, id: &str) -> Result<DocumentOperationResult> {
        check_index(index)?;
        if id.is_empty() {
            return Err(Error::InvalidRequest("get requires a document id".into()));
        }

        let path = format!("{}/_doc/{}", encode_segment(index), encode_segment(id));
        let response = self.send(EngineRequest::get(path)).await?;
        if response.is_success() && DocumentReply::parse(&response.body)?.found == Some(false) {
            return Ok(DocumentOperationResult::new(
                OperationResult::failure(404, "document not found"),
                None,
            ));
        }
        self.document_result(index, Some(id), None, response)
    }

    /// Build the result of a single-document call. On success the returned
    /// document carries the engine's id and version; its content is the
    /// engine's `_source` when present, `sent` otherwise.
    fn document_result(
        &self,
        index: &str,
        id: Option<&str>,
        sent: Option<&Value>,
        response: EngineResponse,
    ) -> Result<DocumentOperationResult> {
        if !response.is_success() {
            return Ok(DocumentOperationResult::new(
                document_failure(response.status, &response.body),
                None,
            ));
        }

        let reply = DocumentReply::parse(&response.body)?;
        let id = reply.id.or_else(|| id.map(str::to_string));
        let path = DocumentPath {
            index: reply.index.unwrap_or_else(|| index.to_string()),
            id: id.clone(),
        };
        let etag = reply.version.map(|v| v.to_string());
        let document = Document {
            id,
            etag: etag.clone(),
            url: Some(path.to_url(&self.config.document_url_prefix)),
            content: reply
                .source
                .or_else(|| sent.cloned())
                .unwrap_or(Value::Null),
        };

        let mut base = OperationResult::success(response.status, None);
        if let Some(etag) = etag {
            base = base.with_version(etag);
        }
        Ok(DocumentOperationResult::new(base, Some(document)))
    }

    /// Query-string search.
    pub async fn search(&self, index: &str, query_text: &str) -> SearchOperationResult {
        fold("search", self.try_search(index, query_text).await)
    }

    async fn try_search(&self, index: &str, query_text: &str) -> Result<SearchOperationResult> {
        check_index(index)?;
        let query: String = url::form_urlencoded::byte_serialize(query_text.as_bytes()).collect();
        let path = format!("{}/_search?q={}", encode_segment(index), query);
        let response = self.send(EngineRequest::get(path)).await?;
        self.search_result(index, response)
    }

    /// Search with a structured query body.
    pub async fn search_with_payload(&self, index: &str, query: &str) -> SearchOperationResult {
        fold("search_with_payload", self.try_post_search(index, query).await)
    }

    /// Suggestion search. Options are returned in `suggest_result`.
    pub async fn suggest(&self, index: &str, payload: &str) -> SearchOperationResult {
        fold("suggest", self.try_post_search(index, payload).await)
    }

    async fn try_post_search(&self, index: &str, payload: &str) -> Result<SearchOperationResult> {
        check_index(index)?;
        let body: Value = serde_json::from_str(payload)
            .map_err(|e| Error::InvalidRequest(format!("malformed query payload: {}", e)))?;
        let path = format!("{}/_search", encode_segment(index));
        let response = self.send(EngineRequest::post(path).json(body.to_string())).await?;
        self.search_result(index, response)
    }

    fn search_result(&self, index: &str, response: EngineResponse) -> Result<SearchOperationResult> {
        if !response.is_success() {
            return Ok(SearchOperationResult::from_base(OperationResult::from_engine(
                response.status,
                &response.body,
            )));
        }

        let parts = decompose_search(&response.body, index, &self.config.document_url_prefix)?;
        debug!(
            "Search on {} returned {} of {} hits",
            index,
            parts.hits.hits.len(),
            parts.hits.total_hits
        );
        Ok(SearchOperationResult {
            base: OperationResult::success(response.status, None),
            search_result: Some(parts.hits),
            aggregation_result: parts.aggregations,
            suggest_result: parts.suggestions,
        })
    }

    pub async fn perform_bulk_operations(&self, requests: &[BulkRequest]) -> OperationResult {
        BulkOrchestrator::new(self.transport.clone(), self.config.document_url_prefix.clone())
            .perform(requests)
            .await
    }

    async fn send(&self, request: EngineRequest) -> Result<EngineResponse> {
        self.transport.send(request).await
    }
}

/// Fold an operation's error into its result envelope.
fn fold<T: From<Error>>(operation: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        if e.is_caller_error() {
            debug!(error_type = e.error_type(), "{} rejected: {}", operation, e);
        } else {
            warn!(error_type = e.error_type(), "{} failed: {}", operation, e);
        }
        e.into()
    })
}

/// Failure envelope for a single-document call. Conflicts and missing
/// documents get their own causes.
fn document_failure(status: u16, body: &str) -> OperationResult {
    let detail = ErrorDetail::from_engine_body(body);
    let result = match status {
        409 => {
            let reason = detail
                .as_ref()
                .map(|d| d.reason.clone())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "document was modified".to_string());
            OperationResult::failure(409, format!("version conflict: {}", reason))
        }
        404 => OperationResult::failure(404, "document not found"),
        _ => return OperationResult::from_engine(status, body),
    };
    match detail {
        Some(detail) => result.with_error(detail),
        None => result,
    }
}

fn check_index(index: &str) -> Result<()> {
    if index.trim().is_empty() {
        return Err(Error::InvalidRequest("index name is empty".into()));
    }
    Ok(())
}

fn require_id<'a>(document: &'a Document, operation: &str) -> Result<&'a str> {
    document
        .id()
        .ok_or_else(|| Error::InvalidRequest(format!("{} requires a document id", operation)))
}

fn document_body(document: &Document) -> Result<String> {
    if !document.content.is_object() {
        return Err(Error::InvalidRequest("document content must be a JSON object".into()));
    }
    Ok(document.content.to_string())
}

/// `?version=<etag>` when an etag is set. Etags are engine versions.
fn version_query(etag: Option<&str>) -> Result<String> {
    match etag {
        Some(etag) => {
            let version: u64 = etag.parse().map_err(|_| {
                Error::InvalidRequest(format!("etag '{}' is not a document version", etag))
            })?;
            Ok(format!("?version={}", version))
        }
        None => Ok(String::new()),
    }
}

/// Percent-encode one path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("orders"), "orders");
        assert_eq!(encode_segment("a b/c+d"), "a%20b%2Fc%2Bd");
    }

    #[test]
    fn test_version_query() {
        assert_eq!(version_query(None).unwrap(), "");
        assert_eq!(version_query(Some("7")).unwrap(), "?version=7");
        assert!(matches!(version_query(Some("v7")), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_document_failure_causes() {
        let body = r#"{"error":{"type":"version_conflict_engine_exception","reason":"[1]: version conflict, current version [3] is different than the one provided [2]"},"status":409}"#;
        let conflict = document_failure(409, body);
        assert_eq!(conflict.result_code(), 409);
        assert!(conflict.failure_cause().unwrap().starts_with("version conflict: [1]"));
        assert_eq!(
            conflict.error().unwrap().error_type,
            "version_conflict_engine_exception"
        );

        let missing = document_failure(404, r#"{"_index":"o","_id":"1","found":false}"#);
        assert_eq!(missing.failure_cause(), Some("document not found"));

        let other = document_failure(500, "boom");
        assert_eq!(other.failure_cause(), Some("boom"));
    }
}
