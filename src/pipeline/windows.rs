//! Fixed-length window assignment
//!
//! Every record is floored to the start of the aligned interval that contains
//! it. With the default 5-minute window, 12:03:41 and 12:04:59 both land in the
//! 12:00 window and 12:08:00 lands in 12:05.

use super::types::WindowKey;
use chrono::{DateTime, TimeDelta, Timelike, Utc};

/// Default window length in minutes
pub const DEFAULT_WINDOW_MINUTES: u32 = 5;

/// Pure mapping from timestamp to window start
///
/// The window length must divide 60 so that windows align to the top of every
/// hour: the floor only touches minutes and below, never the hour or date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAssigner {
    window_minutes: u32,
}

impl WindowAssigner {
    /// # Panics
    ///
    /// If `window_minutes` is zero or does not divide 60. `AggregatorConfig::validate`
    /// rejects such values before they reach here.
    pub fn new(window_minutes: u32) -> Self {
        assert!(
            window_minutes > 0 && 60 % window_minutes == 0,
            "window length must divide 60 minutes, got {}",
            window_minutes
        );
        Self { window_minutes }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    pub fn window_length(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.window_minutes))
    }

    /// Floor `timestamp` to the start of its window
    pub fn assign_window(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let minutes_into_window = i64::from(timestamp.minute() % self.window_minutes);
        let seconds_into_window = minutes_into_window * 60 + i64::from(timestamp.second());

        timestamp
            - TimeDelta::seconds(seconds_into_window)
            - TimeDelta::nanoseconds(i64::from(timestamp.nanosecond()))
    }

    pub fn make_key(&self, sensor_id: &str, timestamp: DateTime<Utc>) -> WindowKey {
        WindowKey::new(sensor_id, self.assign_window(timestamp))
    }
}

impl Default for WindowAssigner {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MINUTES)
    }
}
