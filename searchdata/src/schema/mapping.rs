use super::types::{DocumentFieldSchema, DocumentSchema};
use crate::error::Result;
use serde_json::{json, Map, Value};

/// Build the engine index-mapping object for a schema.
///
/// Produces `{"properties": {...}}` with one entry per field in schema
/// order. Optional directives are emitted only when the schema sets them.
/// The legacy `string` type is written as `text` with `fielddata` enabled so
/// that aggregations over such fields keep working.
pub fn generate_document_mappings(schema: &DocumentSchema) -> Result<Value> {
    schema.validate()?;
    Ok(json!({ "properties": properties(&schema.fields) }))
}

fn properties(fields: &[DocumentFieldSchema]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| (field.name.clone(), field_mapping(field)))
        .collect()
}

fn field_mapping(field: &DocumentFieldSchema) -> Value {
    let mut mapping = Map::new();

    if field.data_type == "string" {
        mapping.insert("type".into(), json!("text"));
        mapping.insert("fielddata".into(), json!(true));
    } else {
        mapping.insert("type".into(), json!(field.data_type));
    }

    if field.data_type == "date" {
        if let Some(format) = &field.format {
            mapping.insert("format".into(), json!(format));
        }
    }
    if let Some(searchable) = field.searchable {
        mapping.insert("index".into(), json!(searchable));
    }
    if let Some(analyzer) = &field.search_analyzer {
        mapping.insert("search_analyzer".into(), json!(analyzer));
    }
    if let Some(analyzer) = &field.index_analyzer {
        mapping.insert("analyzer".into(), json!(analyzer));
    }
    if field.is_nested() {
        mapping.insert("properties".into(), Value::Object(properties(&field.sub_fields)));
    }

    Value::Object(mapping)
}
