//! Core data types for the windowed aggregation engine
//!
//! - `TelemetryRecord` - one decoded sensor observation (input)
//! - `WindowKey` - (sensor, window start) bucket identifier
//! - `AggregateResult` - statistics for one flushed bucket (output)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single decoded telemetry observation
///
/// Immutable once constructed. Validation happens at `submit` time, not here,
/// so the intake layer can hand over whatever it decoded and let the
/// coordinator reject it with a `MalformedRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub sensor_id: String,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    pub fn new(
        sensor_id: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            unit: unit.into(),
            timestamp,
        }
    }

    /// Check the record can enter the buffer
    pub fn validate(&self) -> Result<(), MalformedRecord> {
        if self.sensor_id.is_empty() {
            return Err(MalformedRecord::EmptySensorId);
        }

        if !self.value.is_finite() {
            return Err(MalformedRecord::NonFiniteValue {
                sensor_id: self.sensor_id.clone(),
                value: self.value,
            });
        }

        Ok(())
    }
}

/// Rejection reason for a record that never entered the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedRecord {
    EmptySensorId,
    NonFiniteValue { sensor_id: String, value: f64 },
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRecord::EmptySensorId => write!(f, "Malformed record: empty sensor id"),
            MalformedRecord::NonFiniteValue { sensor_id, value } => {
                write!(f, "Malformed record: non-finite value {} for sensor {}", value, sensor_id)
            }
        }
    }
}

impl std::error::Error for MalformedRecord {}

/// Bucket identifier: sensor plus floored window start
///
/// Ordering is by sensor first, then window start, which gives flushes a
/// deterministic emission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey {
    pub sensor_id: String,
    pub window_start: DateTime<Utc>,
}

impl WindowKey {
    pub fn new(sensor_id: impl Into<String>, window_start: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            window_start,
        }
    }

    /// Compact window start, e.g. `202401011200`
    pub fn window_label(&self) -> String {
        self.window_start.format("%Y%m%d%H%M").to_string()
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.sensor_id, self.window_label())
    }
}

/// Statistics for one flushed bucket, handed to the sink and then dropped
///
/// `window_start`/`window_end` are the earliest/latest timestamps actually
/// observed in the bucket, not the nominal window boundaries. `window_label`
/// is the nominal window start in compact form (`WindowKey::window_label`),
/// which sinks use to name or key their output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub sensor_id: String,
    pub window_label: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub std_dev_value: f64,
    pub count: usize,
    pub unit: String,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_validate_accepts_well_formed_record() {
        let record = TelemetryRecord::new("sensor-001", 25.5, "celsius", ts());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_sensor_id() {
        let record = TelemetryRecord::new("", 25.5, "celsius", ts());
        assert_eq!(record.validate(), Err(MalformedRecord::EmptySensorId));
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let record = TelemetryRecord::new("sensor-001", value, "celsius", ts());
            assert!(matches!(
                record.validate(),
                Err(MalformedRecord::NonFiniteValue { .. })
            ));
        }
    }

    #[test]
    fn test_window_key_display_matches_compact_format() {
        let key = WindowKey::new("sensor-001", ts());
        assert_eq!(key.to_string(), "sensor-001_202401011200");
        assert_eq!(key.window_label(), "202401011200");
    }
}
