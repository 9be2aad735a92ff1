pub mod aggregations;
pub mod authz;
pub mod bulk;
pub mod config;
pub mod document;
pub mod error;
pub mod result;
pub mod routes;
pub mod schema;
pub mod store;
pub mod transport;

pub use config::ElasticSearchConfig;
pub use document::Document;
pub use error::{Error, Result};
pub use result::{DocumentOperationResult, OperationResult, SearchOperationResult};
pub use store::DocumentStore;
