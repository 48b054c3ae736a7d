//! In-memory sink for embedding and tests

use super::backend::{AggregateSink, SinkError};
use crate::pipeline::types::AggregateResult;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Collects every emitted aggregate in arrival order
///
/// Sensors listed via `with_failing_sensors` are rejected with an I/O error,
/// which lets callers exercise the coordinator's sink-failure path.
#[derive(Debug, Default)]
pub struct MemorySink {
    aggregates: Mutex<Vec<AggregateResult>>,
    failing_sensors: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_sensors<I, S>(sensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aggregates: Mutex::new(Vec::new()),
            failing_sensors: sensors.into_iter().map(Into::into).collect(),
        }
    }

    /// Snapshot of everything emitted so far
    pub fn aggregates(&self) -> Vec<AggregateResult> {
        self.aggregates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.aggregates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AggregateSink for MemorySink {
    async fn emit(&self, aggregate: &AggregateResult) -> Result<(), SinkError> {
        if self.failing_sensors.contains(&aggregate.sensor_id) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("sink rejected sensor {}", aggregate.sensor_id),
            )));
        }

        self.aggregates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(aggregate.clone());
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "Memory"
    }
}
