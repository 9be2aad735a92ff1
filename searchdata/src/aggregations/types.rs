use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named aggregation. Nests to whatever depth the originating query did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Single-value metric result (`avg`, `sum`, `cardinality`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub buckets: Vec<AggregationBucket>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_aggregations: Vec<AggregationResult>,
}

impl AggregationResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: None,
            value: None,
            buckets: Vec::new(),
            nested_aggregations: Vec::new(),
        }
    }

    /// Find a direct child aggregation by name.
    pub fn nested(&self, name: &str) -> Option<&AggregationResult> {
        self.nested_aggregations.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationBucket {
    /// Scalar key exactly as the engine sent it (string or number).
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_key: Option<String>,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_aggregation_result: Vec<AggregationResult>,
}

impl AggregationBucket {
    pub fn new(key: Value, count: u64) -> Self {
        Self {
            key,
            formatted_key: None,
            count,
            from: None,
            to: None,
            formatted_from: None,
            formatted_to: None,
            sub_aggregation_result: Vec::new(),
        }
    }

    /// Find a sub-aggregation of this bucket by name.
    pub fn sub_aggregation(&self, name: &str) -> Option<&AggregationResult> {
        self.sub_aggregation_result.iter().find(|a| a.name == name)
    }
}
