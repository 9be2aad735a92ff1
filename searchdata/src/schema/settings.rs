//! Index settings assembled from the settings, analyzer and filter files

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Custom analyzer built from a tokenizer and a filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub behaviours: Vec<String>,
    pub tokenizer: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Named token filter. `configuration` is the engine filter object, either
/// inline or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub configuration: Value,
}

impl FilterSchema {
    fn configuration_object(&self) -> Result<Value> {
        match &self.configuration {
            Value::String(raw) => serde_json::from_str(raw).map_err(|e| {
                Error::Config(format!("filter '{}' has invalid configuration: {}", self.name, e))
            }),
            Value::Object(_) => Ok(self.configuration.clone()),
            other => Err(Error::Config(format!(
                "filter '{}' configuration must be an object, got {}",
                self.name, other
            ))),
        }
    }
}

/// The `settings` half of an index-creation payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSettings {
    settings: Map<String, Value>,
}

impl IndexSettings {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from files. A path that is unset or names a missing file
    /// contributes nothing.
    pub fn load(
        settings_file: Option<&Path>,
        analyzer_file: Option<&Path>,
        filter_file: Option<&Path>,
    ) -> Result<Self> {
        let settings = read_optional(settings_file)?;
        let analyzers = read_optional(analyzer_file)?;
        let filters = read_optional(filter_file)?;
        Self::from_parts(settings.as_deref(), analyzers.as_deref(), filters.as_deref())
    }

    /// Build from raw file contents.
    ///
    /// The settings fragment may be given with or without its outer braces.
    pub fn from_parts(
        settings_fragment: Option<&str>,
        analyzers: Option<&str>,
        filters: Option<&str>,
    ) -> Result<Self> {
        let mut settings = match settings_fragment {
            Some(text) => parse_fragment(text)?,
            None => Map::new(),
        };

        let analyzers: Vec<AnalyzerSchema> = match analyzers.map(str::trim) {
            Some(text) if !text.is_empty() => serde_json::from_str(text)
                .map_err(|e| Error::Config(format!("invalid analyzer configuration: {}", e)))?,
            _ => Vec::new(),
        };
        let filters: Vec<FilterSchema> = match filters.map(str::trim) {
            Some(text) if !text.is_empty() => serde_json::from_str(text)
                .map_err(|e| Error::Config(format!("invalid filter configuration: {}", e)))?,
            _ => Vec::new(),
        };

        if !analyzers.is_empty() || !filters.is_empty() {
            merge_analysis(&mut settings, &analyzers, &filters)?;
        }

        Ok(Self { settings })
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.settings.clone())
    }

    /// Full index-creation body for the given mappings.
    pub fn index_payload(&self, mappings: Value) -> Value {
        json!({ "settings": self.to_value(), "mappings": mappings })
    }
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("settings file {:?} not present, skipping", path);
            Ok(None)
        }
        Err(e) => Err(Error::Config(format!("cannot read {:?}: {}", path, e))),
    }
}

fn parse_fragment(text: &str) -> Result<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }
    let wrapped;
    let source = if trimmed.starts_with('{') {
        trimmed
    } else {
        wrapped = format!("{{{}}}", trimmed);
        &wrapped
    };
    match serde_json::from_str(source) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Config("settings must be a JSON object".into())),
        Err(e) => Err(Error::Config(format!("invalid settings fragment: {}", e))),
    }
}

fn merge_analysis(
    settings: &mut Map<String, Value>,
    analyzers: &[AnalyzerSchema],
    filters: &[FilterSchema],
) -> Result<()> {
    let analysis = settings
        .entry("analysis")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(analysis) = analysis else {
        return Err(Error::Config("settings.analysis must be an object".into()));
    };

    if !filters.is_empty() {
        let filter_map = object_entry(analysis, "filter")?;
        for filter in filters {
            filter_map.insert(filter.name.clone(), filter.configuration_object()?);
        }
    }

    if !analyzers.is_empty() {
        let analyzer_map = object_entry(analysis, "analyzer")?;
        for analyzer in analyzers {
            analyzer_map.insert(
                analyzer.name.clone(),
                json!({
                    "type": "custom",
                    "tokenizer": analyzer.tokenizer,
                    "filter": analyzer.filters,
                }),
            );
        }
    }
    Ok(())
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Map<String, Value>> {
    match map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(inner) => Ok(inner),
        _ => Err(Error::Config(format!("settings.analysis.{} must be an object", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fragment_without_braces() {
        let settings =
            IndexSettings::from_parts(Some("\"number_of_shards\": 3, \"number_of_replicas\": 1"), None, None)
                .unwrap();
        assert_eq!(
            settings.to_value(),
            json!({"number_of_shards": 3, "number_of_replicas": 1})
        );
    }

    #[test]
    fn test_analysis_is_merged() {
        let analyzers = r#"[{"name": "whitespace_analyzer", "tokenizer": "whitespace",
                             "filters": ["lowercase", "asciifolding"]}]"#;
        let filters = r#"[{"name": "ngram_filter",
                           "configuration": "{\"type\": \"nGram\", \"min_gram\": 1}"}]"#;
        let settings =
            IndexSettings::from_parts(Some("{\"number_of_shards\": 1}"), Some(analyzers), Some(filters))
                .unwrap();
        let value = settings.to_value();
        assert_eq!(value["number_of_shards"], 1);
        assert_eq!(value["analysis"]["filter"]["ngram_filter"]["min_gram"], 1);
        assert_eq!(
            value["analysis"]["analyzer"]["whitespace_analyzer"],
            json!({"type": "custom", "tokenizer": "whitespace", "filter": ["lowercase", "asciifolding"]})
        );
    }

    #[test]
    fn test_missing_files_yield_empty_settings() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("settings.json");
        let settings = IndexSettings::load(Some(&missing), None, None).unwrap();
        assert!(settings.is_empty());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "\"refresh_interval\": \"1s\"").unwrap();
        let settings = IndexSettings::load(Some(&path), None, None).unwrap();
        assert_eq!(settings.to_value()["refresh_interval"], "1s");
    }

    #[test]
    fn test_malformed_settings_is_config_error() {
        let err = IndexSettings::from_parts(Some("{not json"), None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_index_payload() {
        let payload = IndexSettings::empty().index_payload(json!({"properties": {}}));
        assert_eq!(payload, json!({"settings": {}, "mappings": {"properties": {}}}));
    }
}
