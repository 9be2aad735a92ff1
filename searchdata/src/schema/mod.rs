//! Document schemas and their translation into engine index payloads

mod mapping;
mod settings;
mod translate;
pub mod types;

pub use mapping::generate_document_mappings;
pub use settings::{AnalyzerSchema, FilterSchema, IndexSettings};
pub use translate::{translate_es_payload, translate_value};
pub use types::{DocumentFieldSchema, DocumentSchema};
