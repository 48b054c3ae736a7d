//! Sinks for flushed aggregates
//!
//! ```text
//! AggregationCoordinator ──emit()──▶ AggregateSink
//!                                     ├─ JsonFileSink  (aggregated/YYYY/MM/DD/HH/*.json)
//!                                     ├─ SqliteAggregateSink (sensor_aggregates table)
//!                                     └─ MemorySink
//! ```

pub mod backend;
pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use backend::{AggregateSink, SinkError};
pub use json_file::JsonFileSink;
pub use memory::MemorySink;
pub use sqlite::SqliteAggregateSink;

use crate::pipeline::config::{AggregatorConfig, SinkBackend};
use std::sync::Arc;

/// Build the sink selected by `config.sink`
pub fn build_sink(config: &AggregatorConfig) -> Result<Arc<dyn AggregateSink>, SinkError> {
    match config.sink {
        SinkBackend::Json => Ok(Arc::new(JsonFileSink::new(&config.output_dir)?)),
        SinkBackend::Sqlite => Ok(Arc::new(SqliteAggregateSink::new(&config.db_path)?)),
    }
}
