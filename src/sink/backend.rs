//! Sink trait for flushed aggregates
//!
//! The coordinator calls `emit` once per flushed, non-empty bucket. It never
//! interprets a `SinkError` beyond logging it: a failed bucket is not re-buffered.

use crate::pipeline::types::AggregateResult;
use async_trait::async_trait;

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err)
    }
}

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        SinkError::Database(err.to_string())
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "IO error: {}", e),
            SinkError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SinkError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination for flushed aggregates
#[async_trait]
pub trait AggregateSink: Send + Sync {
    /// Persist a single aggregate
    async fn emit(&self, aggregate: &AggregateResult) -> Result<(), SinkError>;

    /// Sink type for logging
    fn sink_type(&self) -> &'static str;
}
