use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Data type that carries sub-fields.
pub const NESTED_TYPE: &str = "nested";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchema {
    #[serde(default)]
    pub fields: Vec<DocumentFieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DocumentFieldSchema {
    pub name: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<DocumentFieldSchema>,
}

impl DocumentFieldSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            format: None,
            searchable: None,
            search_analyzer: None,
            index_analyzer: None,
            sub_fields: Vec::new(),
        }
    }

    pub fn is_nested(&self) -> bool {
        self.data_type == NESTED_TYPE
    }
}

impl DocumentSchema {
    pub fn new(fields: Vec<DocumentFieldSchema>) -> Self {
        Self { fields }
    }

    /// Parse and validate a schema document.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: DocumentSchema = serde_json::from_str(json)
            .map_err(|e| Error::Schema(format!("malformed document schema: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reject empty names or types, duplicate names within one level, and
    /// sub-fields on anything but a nested field.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.fields, "")
    }
}

fn validate_fields(fields: &[DocumentFieldSchema], parent: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        let path = if parent.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", parent, field.name)
        };
        if field.name.trim().is_empty() {
            return Err(Error::Schema(format!("field under '{}' has no name", parent)));
        }
        if field.data_type.trim().is_empty() {
            return Err(Error::Schema(format!("field '{}' has no data-type", path)));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(Error::Schema(format!("duplicate field '{}'", path)));
        }
        if !field.sub_fields.is_empty() && !field.is_nested() {
            return Err(Error::Schema(format!(
                "field '{}' of type '{}' cannot have sub-fields",
                path, field.data_type
            )));
        }
        validate_fields(&field.sub_fields, &path)?;
    }
    Ok(())
}
