//! Flush decision policy
//!
//! A flush is due when either the buffer has grown past a record threshold or
//! enough time has passed since the last drain. The scheduler only decides;
//! the buffer performs the drain under its own lock (see `AggregationBuffer`).

use chrono::{DateTime, TimeDelta, Utc};

/// Default maximum time between drains (5 minutes)
pub const DEFAULT_FLUSH_INTERVAL_SECS: i64 = 300;

/// Default buffered-record threshold
pub const DEFAULT_FLUSH_MAX_RECORDS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushScheduler {
    flush_interval: TimeDelta,
    max_buffered: usize,
}

impl FlushScheduler {
    pub fn new(flush_interval: TimeDelta, max_buffered: usize) -> Self {
        Self {
            flush_interval,
            max_buffered,
        }
    }

    pub fn flush_interval(&self) -> TimeDelta {
        self.flush_interval
    }

    pub fn max_buffered(&self) -> usize {
        self.max_buffered
    }

    /// True iff `now - last_flush >= interval` or `total_buffered >= max`
    pub fn should_flush(
        &self,
        now: DateTime<Utc>,
        last_flush: DateTime<Utc>,
        total_buffered: usize,
    ) -> bool {
        now - last_flush >= self.flush_interval || total_buffered >= self.max_buffered
    }
}

impl Default for FlushScheduler {
    fn default() -> Self {
        Self::new(
            TimeDelta::seconds(DEFAULT_FLUSH_INTERVAL_SECS),
            DEFAULT_FLUSH_MAX_RECORDS,
        )
    }
}
