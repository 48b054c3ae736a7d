//! SQLite sink for flushed aggregates
//!
//! Table: `sensor_aggregates`, one row per emitted aggregate. A window flushed
//! more than once (threshold drain mid-window, late records) gets one row per
//! flush; summing `count` over a (sensor, window) gives every record it saw.

use super::backend::{AggregateSink, SinkError};
use crate::pipeline::types::AggregateResult;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sensor_aggregates (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    sensor_id      TEXT    NOT NULL,
    window_label   TEXT    NOT NULL,
    window_start   TEXT    NOT NULL,
    window_end     TEXT    NOT NULL,
    avg_value      REAL    NOT NULL,
    min_value      REAL    NOT NULL,
    max_value      REAL    NOT NULL,
    std_dev_value  REAL    NOT NULL,
    count          INTEGER NOT NULL,
    unit           TEXT    NOT NULL,
    processed_at   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sensor_aggregates_window
    ON sensor_aggregates (sensor_id, window_label);
"#;

pub struct SqliteAggregateSink {
    conn: Mutex<Connection>,
}

impl SqliteAggregateSink {
    /// Open (or create) the database and ensure the schema exists
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let sink = Self::from_connection(Connection::open(db_path.as_ref())?)?;
        log::info!("✅ SQLite aggregate sink initialized: {}", db_path.as_ref().display());
        Ok(sink)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, SinkError> {
        // journal_mode reports the resulting mode; in-memory databases stay "memory"
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("📊 SQLite journal mode: {}", mode);
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SinkError> {
        self.conn
            .lock()
            .map_err(|_| SinkError::Database("connection mutex poisoned".to_string()))
    }

    /// Number of stored aggregates
    pub fn row_count(&self) -> Result<usize, SinkError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sensor_aggregates", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl AggregateSink for SqliteAggregateSink {
    async fn emit(&self, aggregate: &AggregateResult) -> Result<(), SinkError> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO sensor_aggregates (
                sensor_id, window_label, window_start, window_end,
                avg_value, min_value, max_value, std_dev_value,
                count, unit, processed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                aggregate.sensor_id,
                aggregate.window_label,
                aggregate.window_start.to_rfc3339(),
                aggregate.window_end.to_rfc3339(),
                aggregate.avg_value,
                aggregate.min_value,
                aggregate.max_value,
                aggregate.std_dev_value,
                aggregate.count as i64,
                aggregate.unit,
                aggregate.processed_at.to_rfc3339(),
            ],
        )?;

        log::debug!(
            "✅ Aggregate row written: {}_{} (count: {})",
            aggregate.sensor_id,
            aggregate.window_label,
            aggregate.count
        );

        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    fn make_aggregate(sensor_id: &str, window_label: &str, count: usize) -> AggregateResult {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap();
        AggregateResult {
            sensor_id: sensor_id.to_string(),
            window_label: window_label.to_string(),
            window_start: start,
            window_end: start,
            avg_value: 21.5,
            min_value: 20.0,
            max_value: 23.0,
            std_dev_value: 1.5,
            count,
            unit: "celsius".to_string(),
            processed_at: start,
        }
    }

    #[tokio::test]
    async fn test_emit_inserts_rows() {
        let temp_file = NamedTempFile::new().unwrap();
        let sink = SqliteAggregateSink::new(temp_file.path()).unwrap();

        sink.emit(&make_aggregate("s1", "202401011200", 2)).await.unwrap();
        sink.emit(&make_aggregate("s1", "202401011205", 4)).await.unwrap();
        sink.emit(&make_aggregate("s2", "202401011200", 1)).await.unwrap();

        assert_eq!(sink.row_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_every_flush_of_a_window_is_kept() {
        use crate::pipeline::engine::{AggregationCoordinator, SubmitOutcome};
        use crate::pipeline::scheduler::FlushScheduler;
        use crate::pipeline::types::TelemetryRecord;
        use crate::pipeline::windows::WindowAssigner;
        use std::sync::Arc;

        let sink = Arc::new(
            SqliteAggregateSink::from_connection(Connection::open_in_memory().unwrap()).unwrap(),
        );
        let coordinator = AggregationCoordinator::new(
            WindowAssigner::default(),
            FlushScheduler::default(),
            sink.clone(),
        );

        // 150 records in one window: threshold drain at 100, shutdown drain of 50
        let window_start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut threshold_flushes = 0;
        for i in 0..150 {
            let ts = window_start + chrono::TimeDelta::seconds(i);
            let record = TelemetryRecord::new("s1", i as f64, "celsius", ts);
            if let SubmitOutcome::Flushed(_) = coordinator.submit(record).await.unwrap() {
                threshold_flushes += 1;
            }
        }
        let report = coordinator.flush_all().await;

        assert_eq!(threshold_flushes, 1);
        assert_eq!(report.emitted, 1);
        assert_eq!(sink.row_count().unwrap(), 2);

        let conn = sink.conn().unwrap();
        let (rows, total): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), SUM(count) FROM sensor_aggregates \
                 WHERE sensor_id = 's1' AND window_label = '202401011200'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(total, 150);
    }
}
