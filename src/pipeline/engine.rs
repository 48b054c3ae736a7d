//! Aggregation coordinator - the orchestration layer of the engine
//!
//! ```text
//! TelemetryRecord
//!     ↓
//! AggregationCoordinator::submit()  ── MalformedRecord ──▶ caller
//!     ↓
//! AggregationBuffer (append + flush check under one lock)
//!     ↓  flush due
//! DrainedBuckets (lock released)
//!     ↓
//! summarize() per bucket → AggregateResult
//!     ↓
//! AggregateSink::emit()  ── SinkError ──▶ log, next bucket
//! ```
//!
//! A bucket whose sink write fails is dropped. It has already left the buffer
//! and is not re-queued; the error is logged and the flush moves on.

use super::buffer::{AggregationBuffer, DrainedBuckets};
use super::config::AggregatorConfig;
use super::scheduler::FlushScheduler;
use super::stats::summarize;
use super::types::{AggregateResult, MalformedRecord, TelemetryRecord, WindowKey};
use super::windows::WindowAssigner;
use crate::sink::AggregateSink;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of "now" for flush decisions and processed-at stamps
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What one drain produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Buckets drained
    pub windows: usize,
    /// Aggregates the sink accepted
    pub emitted: usize,
    /// Aggregates lost to sink errors
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Record buffered, no flush was due
    Buffered,
    /// Record buffered and this call performed the flush
    Flushed(FlushReport),
}

/// Owns the buffer, the flush policy and the sink
///
/// Construct one per process and share it behind an `Arc`; `submit` may be
/// called from any number of tasks at once.
pub struct AggregationCoordinator {
    buffer: AggregationBuffer,
    scheduler: FlushScheduler,
    sink: Arc<dyn AggregateSink>,
    now_fn: Clock,
}

impl AggregationCoordinator {
    /// Create a coordinator using the system clock
    pub fn new(
        assigner: WindowAssigner,
        scheduler: FlushScheduler,
        sink: Arc<dyn AggregateSink>,
    ) -> Self {
        Self::new_with_clock(assigner, scheduler, sink, Box::new(Utc::now))
    }

    pub fn from_config(config: &AggregatorConfig, sink: Arc<dyn AggregateSink>) -> Self {
        Self::new(config.window_assigner(), config.flush_scheduler(), sink)
    }

    /// Create a coordinator with a custom clock
    ///
    /// The flush timer starts at the clock's current reading.
    pub fn new_with_clock(
        assigner: WindowAssigner,
        scheduler: FlushScheduler,
        sink: Arc<dyn AggregateSink>,
        now_fn: Clock,
    ) -> Self {
        let started_at = now_fn();
        Self {
            buffer: AggregationBuffer::new(assigner, started_at),
            scheduler,
            sink,
            now_fn,
        }
    }

    pub fn buffer(&self) -> &AggregationBuffer {
        &self.buffer
    }

    pub fn scheduler(&self) -> &FlushScheduler {
        &self.scheduler
    }

    /// Validate, buffer, and flush if the policy says so
    ///
    /// Returns once the record is in the buffer (or rejected). When this call
    /// is the one that triggers a flush, the sink writes for that flush also
    /// complete before it returns.
    pub async fn submit(&self, record: TelemetryRecord) -> Result<SubmitOutcome, MalformedRecord> {
        if let Err(e) = record.validate() {
            log::warn!("⚠️  Rejected telemetry: {}", e);
            return Err(e);
        }

        log::debug!(
            "📥 Received telemetry: sensor={}, value={}, unit={}",
            record.sensor_id,
            record.value,
            record.unit
        );

        let now = (self.now_fn)();
        match self
            .buffer
            .append_and_drain_if_due(record, &self.scheduler, now)
        {
            Some(drained) => Ok(SubmitOutcome::Flushed(self.process_drained(drained).await)),
            None => Ok(SubmitOutcome::Buffered),
        }
    }

    /// Flush if the policy says so, without submitting anything
    ///
    /// Used by the ingestion timer so an idle stream still flushes once the
    /// interval passes. Returns `None` when nothing was drained.
    pub async fn flush_if_due(&self) -> Option<FlushReport> {
        let now = (self.now_fn)();
        let drained = self.buffer.drain_if_due(&self.scheduler, now)?;
        Some(self.process_drained(drained).await)
    }

    /// Drain everything regardless of policy (shutdown path)
    ///
    /// On an empty buffer this is a no-op and leaves the flush clock alone.
    pub async fn flush_all(&self) -> FlushReport {
        let now = (self.now_fn)();
        let drained = self.buffer.drain_all_at(now);
        self.process_drained(drained).await
    }

    async fn process_drained(&self, drained: DrainedBuckets) -> FlushReport {
        let mut report = FlushReport {
            windows: drained.len(),
            ..FlushReport::default()
        };

        if drained.is_empty() {
            return report;
        }

        log::info!(
            "🔄 Flushing aggregations for {} windows ({} sink)",
            drained.len(),
            self.sink.sink_type()
        );

        let processed_at = (self.now_fn)();
        let mut buckets: Vec<_> = drained.into_iter().collect();
        buckets.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, records) in buckets {
            let aggregate = build_aggregate(&key, &records, processed_at);

            match self.sink.emit(&aggregate).await {
                Ok(()) => {
                    report.emitted += 1;
                    log::info!(
                        "📊 Aggregated {} messages for sensor={}, window={} to {}, avg={:.2}, min={:.2}, max={:.2}, stddev={:.2}",
                        aggregate.count,
                        aggregate.sensor_id,
                        aggregate.window_start.format("%Y-%m-%d %H:%M"),
                        aggregate.window_end.format("%Y-%m-%d %H:%M"),
                        aggregate.avg_value,
                        aggregate.min_value,
                        aggregate.max_value,
                        aggregate.std_dev_value
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!(
                        "❌ Failed to write aggregate for {} ({} records dropped): {}",
                        key,
                        aggregate.count,
                        e
                    );
                }
            }
        }

        log::info!(
            "✅ Flush complete: {} windows, {} written, {} failed",
            report.windows,
            report.emitted,
            report.failed
        );

        report
    }
}

/// Build the aggregate for one drained bucket
///
/// `window_start`/`window_end` are the extreme timestamps present in `records`.
///
/// # Panics
///
/// If `records` is empty; the buffer never produces empty buckets.
pub fn build_aggregate(
    key: &WindowKey,
    records: &[TelemetryRecord],
    processed_at: DateTime<Utc>,
) -> AggregateResult {
    let Some(first) = records.first() else {
        panic!("bucket {} drained with no records", key);
    };

    let (window_start, window_end) = records.iter().fold(
        (first.timestamp, first.timestamp),
        |(start, end), r| (start.min(r.timestamp), end.max(r.timestamp)),
    );

    let values: Vec<f64> = records.iter().map(|r| r.value).collect();
    let summary = summarize(&values);

    AggregateResult {
        sensor_id: key.sensor_id.clone(),
        window_label: key.window_label(),
        window_start,
        window_end,
        avg_value: summary.avg,
        min_value: summary.min,
        max_value: summary.max,
        std_dev_value: summary.std_dev,
        count: summary.count,
        unit: first.unit.clone(),
        processed_at,
    }
}
