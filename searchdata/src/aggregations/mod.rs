//! Typed aggregation results rebuilt from the engine's response JSON

mod parser;
pub mod types;

pub use parser::parse_aggregations;
pub use types::{AggregationBucket, AggregationResult};
