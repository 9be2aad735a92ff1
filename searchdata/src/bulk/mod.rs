//! Batched create/update/delete against the engine's `_bulk` API

mod orchestrator;
pub mod request;
pub mod response;

pub use orchestrator::BulkOrchestrator;
pub use request::{parse_bulk_requests, BulkMetaData, BulkOperation, BulkRequest, OperationType};
pub use response::{
    BulkItemResult, BulkResultSet, ElasticSearchBulkResponse, ElasticSearchError,
    ElasticSearchOperationStatus, ElasticSearchResultItem, ElasticSearchShardStatus,
};
