//! Intake adapter - decode newline-delimited JSON telemetry
//!
//! Wire shape (one object per line):
//!
//! ```json
//! {"sensor_id": "sensor-001", "value": 25.5, "unit": "celsius", "timestamp": 1704110401000}
//! ```
//!
//! `timestamp` is Unix epoch milliseconds. Field-level validation (empty
//! sensor id, non-finite value) is left to the coordinator.

use crate::pipeline::types::TelemetryRecord;
use chrono::DateTime;
use serde::Deserialize;

#[derive(Debug)]
pub enum IntakeError {
    Json(serde_json::Error),
    InvalidTimestamp(i64),
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::Json(err)
    }
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::Json(e) => write!(f, "JSON decode error: {}", e),
            IntakeError::InvalidTimestamp(ms) => write!(f, "Timestamp out of range: {}", ms),
        }
    }
}

impl std::error::Error for IntakeError {}

/// Telemetry as it arrives on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct InboundTelemetry {
    pub sensor_id: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    /// Unix epoch milliseconds
    pub timestamp: i64,
}

impl InboundTelemetry {
    pub fn into_record(self) -> Result<TelemetryRecord, IntakeError> {
        let timestamp = DateTime::from_timestamp_millis(self.timestamp)
            .ok_or(IntakeError::InvalidTimestamp(self.timestamp))?;

        Ok(TelemetryRecord::new(self.sensor_id, self.value, self.unit, timestamp))
    }
}

/// Decode one line of input into a record
pub fn parse_record_line(line: &str) -> Result<TelemetryRecord, IntakeError> {
    let inbound: InboundTelemetry = serde_json::from_str(line.trim())?;
    inbound.into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_valid_line() {
        let record = parse_record_line(
            r#"{"sensor_id": "sensor-001", "value": 25.5, "unit": "celsius", "timestamp": 1704110401000}"#,
        )
        .unwrap();

        assert_eq!(record.sensor_id, "sensor-001");
        assert_eq!(record.value, 25.5);
        assert_eq!(record.unit, "celsius");
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap());
    }

    #[test]
    fn test_parse_keeps_subsecond_precision() {
        let record =
            parse_record_line(r#"{"sensor_id":"s","value":1,"unit":"u","timestamp":1704110401250}"#)
                .unwrap();
        assert_eq!(record.timestamp.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_missing_unit_defaults_to_empty() {
        let record =
            parse_record_line(r#"{"sensor_id":"s","value":-10.0,"timestamp":0}"#).unwrap();
        assert_eq!(record.unit, "");
        assert_eq!(record.value, -10.0);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            parse_record_line("not json"),
            Err(IntakeError::Json(_))
        ));
        assert!(matches!(
            parse_record_line(r#"{"sensor_id":"s","unit":"u","timestamp":0}"#),
            Err(IntakeError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_timestamp() {
        let line = format!(r#"{{"sensor_id":"s","value":1,"unit":"u","timestamp":{}}}"#, i64::MAX);
        assert!(matches!(
            parse_record_line(&line),
            Err(IntakeError::InvalidTimestamp(_))
        ));
    }
}
