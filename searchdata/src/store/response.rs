//! Decomposition of engine document and search responses

use crate::aggregations::{parse_aggregations, AggregationResult};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::result::{SearchHit, SearchHits, SuggestHit};
use crate::routes::DocumentPath;
use serde::Deserialize;
use serde_json::Value;

/// Body of a single-document reply (`_doc` create, update, delete, get).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentReply {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_version", default)]
    pub version: Option<u64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub found: Option<bool>,
}

impl DocumentReply {
    pub fn parse(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(body).map_err(|e| Error::Engine {
            status: 502,
            reason: format!("unparseable document response: {}", e),
        })
    }
}

/// Parts of a search reply handed back in a `SearchOperationResult`.
#[derive(Debug, Default)]
pub(crate) struct SearchParts {
    pub hits: SearchHits,
    pub aggregations: Vec<AggregationResult>,
    pub suggestions: Vec<SuggestHit>,
}

pub(crate) fn decompose_search(body: &str, index: &str, url_prefix: &str) -> Result<SearchParts> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::Engine {
        status: 502,
        reason: format!("unparseable search response: {}", e),
    })?;

    let hits: Vec<SearchHit> = value["hits"]["hits"]
        .as_array()
        .map(|hits| hits.iter().map(|h| search_hit(h, index, url_prefix)).collect())
        .unwrap_or_default();

    let total_hits = match &value["hits"]["total"] {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::Object(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => hits.len() as u64,
    };

    Ok(SearchParts {
        hits: SearchHits { total_hits, hits },
        aggregations: parse_aggregations(&value["aggregations"]),
        suggestions: suggestions(&value["suggest"]),
    })
}

fn search_hit(hit: &Value, index: &str, url_prefix: &str) -> SearchHit {
    let id = hit["_id"].as_str().map(str::to_string);
    let path = DocumentPath {
        index: hit["_index"].as_str().unwrap_or(index).to_string(),
        id: id.clone(),
    };
    SearchHit {
        score: hit["_score"].as_f64(),
        document: Document {
            id,
            etag: hit["_version"].as_u64().map(|v| v.to_string()),
            url: Some(path.to_url(url_prefix)),
            content: hit.get("_source").cloned().unwrap_or(Value::Null),
        },
    }
}

/// Flatten `suggest.<name>[].options[]` into one list, in response order.
fn suggestions(suggest: &Value) -> Vec<SuggestHit> {
    let Some(suggest) = suggest.as_object() else {
        return Vec::new();
    };
    suggest
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|entry| entry["options"].as_array())
        .flatten()
        .map(|option| SuggestHit {
            text: option["text"].as_str().unwrap_or_default().to_string(),
            score: option["_score"].as_f64().or_else(|| option["score"].as_f64()),
            payload: option
                .get("payload")
                .or_else(|| option.get("_source"))
                .cloned(),
        })
        .collect()
}
