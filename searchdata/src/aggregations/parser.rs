//! Recursive conversion of the engine's `aggregations` object
//!
//! The engine encodes different aggregation families with different shapes
//! under one grammar:
//!
//! - bucket families (`terms`, `histogram`, `date_histogram`, `range` with
//!   `keyed: false`) carry a `buckets` array, or an object when `keyed: true`
//! - single-bucket families (`filter`, `nested`, `global`) carry a bare
//!   `doc_count` with their sub-aggregations as sibling objects
//! - a range entry without `buckets` carries its boundaries inline
//!
//! Any object-valued field that is not one of the recognised keys is taken to
//! be a nested aggregation and parsed the same way.

use super::types::{AggregationBucket, AggregationResult};
use serde_json::{Map, Value};
use tracing::debug;

/// Fields with fixed meaning inside an aggregation or bucket object.
const RESERVED_FIELDS: &[&str] = &[
    "buckets",
    "key",
    "key_as_string",
    "doc_count",
    "doc_count_error_upper_bound",
    "sum_other_doc_count",
    "from",
    "from_as_string",
    "to",
    "to_as_string",
    "value",
    "value_as_string",
    "meta",
];

/// Parse the `aggregations` object of a search response.
///
/// Returns one result per top-level key in input order. Anything other than
/// a JSON object yields an empty list.
pub fn parse_aggregations(aggregations: &Value) -> Vec<AggregationResult> {
    match aggregations {
        Value::Object(map) => map
            .iter()
            .filter_map(|(name, value)| value.as_object().map(|obj| parse_aggregation(name, obj)))
            .collect(),
        Value::Null => Vec::new(),
        other => {
            debug!("ignoring non-object aggregations value: {}", other);
            Vec::new()
        }
    }
}

/// Nested aggregations of an aggregation or bucket object; reserved fields
/// are skipped.
fn parse_named(map: &Map<String, Value>) -> Vec<AggregationResult> {
    map.iter()
        .filter(|(name, _)| !RESERVED_FIELDS.contains(&name.as_str()))
        .filter_map(|(name, value)| match value {
            Value::Object(obj) => Some(parse_aggregation(name, obj)),
            _ => None,
        })
        .collect()
}

fn parse_aggregation(name: &str, obj: &Map<String, Value>) -> AggregationResult {
    let mut result = AggregationResult::new(name);
    result.count = obj.get("doc_count").and_then(as_count);
    result.value = obj.get("value").and_then(Value::as_f64);

    match obj.get("buckets") {
        Some(Value::Array(items)) => {
            result.buckets = items
                .iter()
                .filter_map(Value::as_object)
                .map(|b| parse_bucket(b, None))
                .collect();
        }
        Some(Value::Object(keyed)) => {
            result.buckets = keyed
                .iter()
                .filter_map(|(key, b)| b.as_object().map(|b| parse_bucket(b, Some(key))))
                .collect();
        }
        _ if obj.contains_key("from") || obj.contains_key("to") => {
            let key = obj
                .get("key")
                .cloned()
                .unwrap_or_else(|| Value::String(name.to_string()));
            let mut bucket = AggregationBucket::new(key, result.count.unwrap_or(0));
            bucket.formatted_key = string_field(obj, "key_as_string");
            read_boundaries(obj, &mut bucket);
            result.buckets.push(bucket);
        }
        _ => {}
    }

    result.nested_aggregations = parse_named(obj);
    result
}

fn parse_bucket(obj: &Map<String, Value>, keyed_as: Option<&String>) -> AggregationBucket {
    let key = match keyed_as {
        Some(k) => Value::String(k.clone()),
        None => obj.get("key").cloned().unwrap_or(Value::Null),
    };
    let count = obj.get("doc_count").and_then(as_count).unwrap_or(0);

    let mut bucket = AggregationBucket::new(key, count);
    bucket.formatted_key = string_field(obj, "key_as_string");
    read_boundaries(obj, &mut bucket);
    bucket.sub_aggregation_result = parse_named(obj);
    bucket
}

fn read_boundaries(obj: &Map<String, Value>, bucket: &mut AggregationBucket) {
    bucket.from = obj.get("from").and_then(Value::as_f64);
    bucket.to = obj.get("to").and_then(Value::as_f64);
    bucket.formatted_from = string_field(obj, "from_as_string");
    bucket.formatted_to = string_field(obj, "to_as_string");
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field).and_then(Value::as_str).map(str::to_string)
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}
