//! Transport to the backing engine
//!
//! The document store talks to the engine only through [`EngineTransport`],
//! so the HTTP client can be swapped for an in-memory engine in tests.

mod http;
pub mod password;
pub mod tls;

pub use http::{basic_auth_value, HttpTransport};

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One request against the engine, relative to its root URL.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub method: Method,
    /// Path and query string, e.g. `orders/_doc/17?version=3`
    pub path: String,
    pub body: Option<String>,
    pub content_type: &'static str,
}

impl EngineRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            content_type: JSON_CONTENT_TYPE,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn json(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = JSON_CONTENT_TYPE;
        self
    }

    pub fn ndjson(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = NDJSON_CONTENT_TYPE;
        self
    }
}

/// Raw engine reply. Non-2xx statuses are ordinary responses, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub status: u16,
    pub body: String,
}

impl EngineResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the engine.
///
/// Implementations return `Err` only when no HTTP response was obtained
/// (connection refused, TLS failure, timeout).
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse>;
}
