//! JSON file sink - one pretty-printed file per aggregate
//!
//! Layout under the output root:
//!
//! ```text
//! aggregated/2024/01/01/12/202401011200-sensor-001.json
//!            └─ processed-at hour   └─ window   └─ sensor
//! ```
//!
//! Re-emitting the same window in the same hour overwrites the earlier file.

use super::backend::{AggregateSink, SinkError};
use crate::pipeline::types::AggregateResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        log::info!("📝 Writing aggregates to: {}", root.display());

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path for an aggregate, e.g. `aggregated/2024/01/01/12/202401011200-s1.json`
    pub fn relative_path(aggregate: &AggregateResult) -> PathBuf {
        let hour_dir = aggregate.processed_at.format("%Y/%m/%d/%H").to_string();
        let file_name = format!(
            "{}-{}.json",
            aggregate.window_label,
            sanitize_file_component(&aggregate.sensor_id)
        );

        Path::new("aggregated").join(hour_dir).join(file_name)
    }
}

// Sensor ids come from devices; keep them from escaping the hour directory.
fn sanitize_file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[async_trait]
impl AggregateSink for JsonFileSink {
    async fn emit(&self, aggregate: &AggregateResult) -> Result<(), SinkError> {
        let path = self.root.join(Self::relative_path(aggregate));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(aggregate)?;
        tokio::fs::write(&path, json).await?;

        log::debug!("✅ Aggregate written: {}", path.display());
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_aggregate(sensor_id: &str) -> AggregateResult {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap();
        AggregateResult {
            sensor_id: sensor_id.to_string(),
            window_label: "202401011200".to_string(),
            window_start: start,
            window_end: Utc.with_ymd_and_hms(2024, 1, 1, 12, 4, 59).unwrap(),
            avg_value: 20.0,
            min_value: 10.0,
            max_value: 30.0,
            std_dev_value: 8.165,
            count: 3,
            unit: "celsius".to_string(),
            processed_at: Utc.with_ymd_and_hms(2024, 1, 1, 13, 2, 0).unwrap(),
        }
    }

    #[test]
    fn test_relative_path_layout() {
        let path = JsonFileSink::relative_path(&make_aggregate("sensor-001"));
        assert_eq!(
            path,
            Path::new("aggregated/2024/01/01/13/202401011200-sensor-001.json")
        );
    }

    #[test]
    fn test_relative_path_sanitizes_sensor_id() {
        let path = JsonFileSink::relative_path(&make_aggregate("../plant/a:b"));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "202401011200-.._plant_a_b.json"
        );
    }

    #[tokio::test]
    async fn test_emit_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path()).unwrap();
        let aggregate = make_aggregate("sensor-001");

        sink.emit(&aggregate).await.unwrap();

        let written = dir.path().join(JsonFileSink::relative_path(&aggregate));
        let contents = std::fs::read_to_string(written).unwrap();
        let parsed: AggregateResult = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, aggregate);
    }

    #[tokio::test]
    async fn test_emit_overwrites_same_window() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path()).unwrap();

        let mut aggregate = make_aggregate("sensor-001");
        sink.emit(&aggregate).await.unwrap();
        aggregate.count = 7;
        sink.emit(&aggregate).await.unwrap();

        let written = dir.path().join(JsonFileSink::relative_path(&aggregate));
        let parsed: AggregateResult =
            serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(parsed.count, 7);
    }
}
