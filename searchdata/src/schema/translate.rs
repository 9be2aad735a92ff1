//! Migration of legacy field-option syntax to the current engine dialect
//!
//! Stored index payloads predate the engine's removal of the `string` type and
//! of string-valued `index` options. The rewrite rules are:
//!
//! | legacy                                   | current                                  |
//! |------------------------------------------|------------------------------------------|
//! | `"type": "string"`, `"index": "analyzed"` | `"type": "text"`, `"index": true`, `"fielddata": true` |
//! | `"type": "string"` (no `index`)          | `"type": "text"`, `"fielddata": true`    |
//! | `"type": "string"`, `"index": "not_analyzed"` | `"type": "keyword"`, `"index": true` |
//! | `"index": "not_analyzed"`                | `"index": true`                          |
//! | `"index": "no"`                          | `"index": false`                         |
//!
//! Everything else passes through untouched, so the rewrite is idempotent.

use crate::error::{Error, Result};
use serde_json::Value;

/// Rewrite a legacy payload. Malformed JSON is a schema error.
pub fn translate_es_payload(payload: &str) -> Result<String> {
    let mut value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::Schema(format!("cannot translate payload: {}", e)))?;
    translate_value(&mut value);
    serde_json::to_string(&value).map_err(|e| Error::Schema(e.to_string()))
}

/// Rewrite a parsed payload in place.
pub fn translate_value(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            for child in obj.values_mut() {
                translate_value(child);
            }

            let legacy_string = obj.get("type").and_then(Value::as_str) == Some("string");
            let index = obj.get("index").and_then(Value::as_str).map(str::to_string);

            match index.as_deref() {
                Some("analyzed") => {
                    obj.insert("index".into(), Value::Bool(true));
                }
                Some("not_analyzed") => {
                    obj.insert("index".into(), Value::Bool(true));
                }
                Some("no") => {
                    obj.insert("index".into(), Value::Bool(false));
                }
                _ => {}
            }

            if legacy_string {
                match index.as_deref() {
                    // Exact-match strings keep their term semantics
                    Some("not_analyzed") => {
                        obj.insert("type".into(), Value::String("keyword".into()));
                    }
                    Some("no") => {
                        obj.insert("type".into(), Value::String("text".into()));
                    }
                    _ => {
                        obj.insert("type".into(), Value::String("text".into()));
                        obj.insert("fielddata".into(), Value::Bool(true));
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                translate_value(item);
            }
        }
        _ => {}
    }
}
