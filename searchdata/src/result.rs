//! Result envelopes returned by every document-store operation
//!
//! `OperationResult` is the base envelope. Document and search operations wrap
//! it by value (`DocumentOperationResult`, `SearchOperationResult`) and add
//! their own payloads, flattened into the same JSON object on output.
//!
//! The envelope keeps one invariant: `failure_cause` is present and non-empty
//! exactly when `result_code` falls outside `200..=299`. All constructors
//! uphold it, which is why the fields are private.

use crate::aggregations::AggregationResult;
use crate::document::Document;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured error reported by the engine or derived from a local failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
}

impl ErrorDetail {
    /// Extract `error.type`/`error.reason` from an engine error body.
    ///
    /// Accepts both the object form (`{"error": {"type", "reason"}}`) and the
    /// bare string form some engine versions send (`{"error": "..."}`).
    pub fn from_engine_body(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        match value.get("error")? {
            Value::Object(obj) => Some(Self {
                error_type: obj
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("exception")
                    .to_string(),
                reason: obj
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            Value::String(s) => Some(Self {
                error_type: "exception".to_string(),
                reason: s.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    result_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
}

fn is_success_code(code: u16) -> bool {
    (200..300).contains(&code)
}

impl OperationResult {
    /// Successful result. A non-2xx `code` is treated as 200.
    pub fn success(code: u16, result: Option<String>) -> Self {
        Self {
            result_code: if is_success_code(code) { code } else { 200 },
            result,
            failure_cause: None,
            result_version: None,
            error: None,
        }
    }

    pub fn ok() -> Self {
        Self::success(200, None)
    }

    /// Failed result. A 2xx `code` is treated as 500 and an empty cause is
    /// replaced by a generic one naming the code.
    pub fn failure(code: u16, cause: impl Into<String>) -> Self {
        let code = if is_success_code(code) { 500 } else { code };
        let mut cause = cause.into();
        if cause.trim().is_empty() {
            cause = format!("operation failed with status {}", code);
        }
        Self {
            result_code: code,
            result: None,
            failure_cause: Some(cause),
            result_version: None,
            error: None,
        }
    }

    /// Build a result from a raw engine response.
    ///
    /// On failure the engine's reason text is kept verbatim as the cause, and
    /// the parsed error object (when there is one) is attached.
    pub fn from_engine(status: u16, body: &str) -> Self {
        if is_success_code(status) {
            let result = (!body.is_empty()).then(|| body.to_string());
            return Self::success(status, result);
        }
        match ErrorDetail::from_engine_body(body) {
            Some(detail) => {
                let cause = if detail.reason.is_empty() {
                    body.to_string()
                } else {
                    detail.reason.clone()
                };
                Self::failure(status, cause).with_error(detail)
            }
            None => Self::failure(status, body),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.result_version = Some(version.into());
        self
    }

    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn result_code(&self) -> u16 {
        self.result_code
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn failure_cause(&self) -> Option<&str> {
        self.failure_cause.as_deref()
    }

    pub fn result_version(&self) -> Option<&str> {
        self.result_version.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        is_success_code(self.result_code)
    }
}

impl From<Error> for OperationResult {
    fn from(err: Error) -> Self {
        let detail = ErrorDetail {
            error_type: err.error_type().to_string(),
            reason: err.to_string(),
        };
        OperationResult::failure(err.result_code(), err.to_string()).with_error(detail)
    }
}

/// Result of a single-document operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOperationResult {
    #[serde(flatten)]
    pub base: OperationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl DocumentOperationResult {
    pub fn new(base: OperationResult, document: Option<Document>) -> Self {
        Self { base, document }
    }

    pub fn is_success(&self) -> bool {
        self.base.is_success()
    }
}

impl From<Error> for DocumentOperationResult {
    fn from(err: Error) -> Self {
        Self::new(err.into(), None)
    }
}

/// One scored document from a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: Option<f64>,
    pub document: Document,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHits {
    pub total_hits: u64,
    pub hits: Vec<SearchHit>,
}

/// One completion option from a suggest request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestHit {
    pub text: String,
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Result of a search or suggest request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOperationResult {
    #[serde(flatten)]
    pub base: OperationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_result: Option<SearchHits>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregation_result: Vec<AggregationResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggest_result: Vec<SuggestHit>,
}

impl SearchOperationResult {
    pub fn from_base(base: OperationResult) -> Self {
        Self {
            base,
            search_result: None,
            aggregation_result: Vec::new(),
            suggest_result: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.base.is_success()
    }
}

impl From<Error> for SearchOperationResult {
    fn from(err: Error) -> Self {
        Self::from_base(err.into())
    }
}
