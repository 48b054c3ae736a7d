//! Concurrent aggregation buffer
//!
//! One `std::sync::Mutex` guards the bucket map, the running record count and
//! the last-flush instant. Every mutation and every flush decision that feeds
//! a drain runs under that single lock, so:
//! - an `append` is either fully visible to a drain or fully absent from it
//! - two callers that both see "flush due" produce exactly one drain; the
//!   second one re-checks against the already-reset state and backs off
//!
//! The lock is never held across I/O. Drains hand back an owned snapshot and
//! release the lock before statistics or sink writes happen.

use super::scheduler::FlushScheduler;
use super::types::{TelemetryRecord, WindowKey};
use super::windows::WindowAssigner;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Snapshot returned by a drain: every bucket that was buffered at that instant
pub type DrainedBuckets = HashMap<WindowKey, Vec<TelemetryRecord>>;

#[derive(Debug)]
struct BufferState {
    buckets: DrainedBuckets,
    /// Sum of bucket lengths, maintained alongside `buckets`
    buffered: usize,
    last_flush: DateTime<Utc>,
}

impl BufferState {
    fn push(&mut self, key: WindowKey, record: TelemetryRecord) {
        self.buckets.entry(key).or_default().push(record);
        self.buffered += 1;
    }

    fn take(&mut self, now: Option<DateTime<Utc>>) -> DrainedBuckets {
        self.buffered = 0;
        if let Some(now) = now {
            self.last_flush = now;
        }
        std::mem::take(&mut self.buckets)
    }

    fn take_if_due(
        &mut self,
        scheduler: &FlushScheduler,
        now: DateTime<Utc>,
    ) -> Option<DrainedBuckets> {
        if self.buffered == 0 || !scheduler.should_flush(now, self.last_flush, self.buffered) {
            return None;
        }
        Some(self.take(Some(now)))
    }
}

/// Window-keyed buffer shared by all submitters
#[derive(Debug)]
pub struct AggregationBuffer {
    assigner: WindowAssigner,
    state: Mutex<BufferState>,
}

impl AggregationBuffer {
    /// Create an empty buffer whose flush clock starts at `started_at`
    pub fn new(assigner: WindowAssigner, started_at: DateTime<Utc>) -> Self {
        Self {
            assigner,
            state: Mutex::new(BufferState {
                buckets: HashMap::new(),
                buffered: 0,
                last_flush: started_at,
            }),
        }
    }

    pub fn assigner(&self) -> &WindowAssigner {
        &self.assigner
    }

    // Every operation replaces or extends the state as a whole, so a panic in
    // another holder cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a record to its (sensor, window) bucket, creating the bucket if needed
    pub fn append(&self, record: TelemetryRecord) {
        let key = self.assigner.make_key(&record.sensor_id, record.timestamp);
        self.lock().push(key, record);
    }

    /// Atomically swap the bucket map for an empty one and return the old map
    ///
    /// Leaves the last-flush instant untouched; see `drain_all_at`.
    pub fn drain_all(&self) -> DrainedBuckets {
        self.lock().take(None)
    }

    /// Like `drain_all`, and records `now` as the last flush
    ///
    /// An empty buffer returns an empty map and keeps its flush clock.
    pub fn drain_all_at(&self, now: DateTime<Utc>) -> DrainedBuckets {
        let mut state = self.lock();
        if state.buffered == 0 {
            return DrainedBuckets::new();
        }
        state.take(Some(now))
    }

    /// Drain only if `scheduler` says a flush is due at `now`
    ///
    /// An empty buffer is never drained and does not advance the flush clock.
    pub fn drain_if_due(
        &self,
        scheduler: &FlushScheduler,
        now: DateTime<Utc>,
    ) -> Option<DrainedBuckets> {
        self.lock().take_if_due(scheduler, now)
    }

    /// Append, then check-and-drain, in one lock acquisition
    pub fn append_and_drain_if_due(
        &self,
        record: TelemetryRecord,
        scheduler: &FlushScheduler,
        now: DateTime<Utc>,
    ) -> Option<DrainedBuckets> {
        let key = self.assigner.make_key(&record.sensor_id, record.timestamp);

        let mut state = self.lock();
        state.push(key, record);
        state.take_if_due(scheduler, now)
    }

    pub fn total_buffered_count(&self) -> usize {
        self.lock().buffered
    }

    pub fn is_empty(&self) -> bool {
        self.lock().buffered == 0
    }

    pub fn window_count(&self) -> usize {
        self.lock().buckets.len()
    }

    pub fn last_flush(&self) -> DateTime<Utc> {
        self.lock().last_flush
    }
}
