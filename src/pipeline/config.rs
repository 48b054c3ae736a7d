//! Aggregator configuration from environment variables

use super::scheduler::{FlushScheduler, DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_FLUSH_MAX_RECORDS};
use super::windows::{WindowAssigner, DEFAULT_WINDOW_MINUTES};
use chrono::TimeDelta;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkBackend {
    Json,
    Sqlite,
}

impl SinkBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkBackend::Json => "json",
            SinkBackend::Sqlite => "sqlite",
        }
    }
}

impl FromStr for SinkBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(SinkBackend::Json),
            "sqlite" => Ok(SinkBackend::Sqlite),
            other => Err(ConfigError::InvalidValue(format!(
                "SENSORFLOW_SINK must be 'json' or 'sqlite', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the aggregation runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Where flushed aggregates go
    pub sink: SinkBackend,

    /// Root directory for the JSON sink
    pub output_dir: String,

    /// SQLite database file for the SQLite sink
    pub db_path: String,

    /// Window length in minutes (must divide 60)
    pub window_minutes: u32,

    /// Maximum seconds between drains
    pub flush_interval_secs: i64,

    /// Buffered-record count that forces a drain
    pub flush_max_records: usize,

    /// How often the ingestion loop re-checks the flush policy without new records
    pub flush_tick_ms: u64,

    /// Intake channel capacity (records)
    pub channel_buffer: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sink: SinkBackend::Json,
            output_dir: "./processed-data".to_string(),
            db_path: "./sensorflow.db".to_string(),
            window_minutes: DEFAULT_WINDOW_MINUTES,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            flush_max_records: DEFAULT_FLUSH_MAX_RECORDS,
            flush_tick_ms: 1_000,
            channel_buffer: 10_000,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SENSORFLOW_SINK` (default: json)
    /// - `SENSORFLOW_OUTPUT_DIR` (default: ./processed-data)
    /// - `SENSORFLOW_DB_PATH` (default: ./sensorflow.db)
    /// - `WINDOW_MINUTES` (default: 5)
    /// - `FLUSH_INTERVAL_SECS` (default: 300)
    /// - `FLUSH_MAX_RECORDS` (default: 100)
    /// - `FLUSH_TICK_MS` (default: 1000)
    /// - `INTAKE_CHANNEL_BUFFER` (default: 10000)
    ///
    /// Unparseable numbers fall back to their defaults; an unknown sink name is
    /// an error. Call `validate` before building anything from the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let sink = match env::var("SENSORFLOW_SINK") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.sink,
        };

        Ok(Self {
            sink,
            output_dir: env::var("SENSORFLOW_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            db_path: env::var("SENSORFLOW_DB_PATH").unwrap_or(defaults.db_path),
            window_minutes: parse_var("WINDOW_MINUTES").unwrap_or(defaults.window_minutes),
            flush_interval_secs: parse_var("FLUSH_INTERVAL_SECS")
                .unwrap_or(defaults.flush_interval_secs),
            flush_max_records: parse_var("FLUSH_MAX_RECORDS").unwrap_or(defaults.flush_max_records),
            flush_tick_ms: parse_var("FLUSH_TICK_MS").unwrap_or(defaults.flush_tick_ms),
            channel_buffer: parse_var("INTAKE_CHANNEL_BUFFER").unwrap_or(defaults.channel_buffer),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_minutes == 0 || 60 % self.window_minutes != 0 {
            return Err(ConfigError::InvalidValue(format!(
                "WINDOW_MINUTES must divide 60, got {}",
                self.window_minutes
            )));
        }

        if self.flush_interval_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "FLUSH_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        if self.flush_max_records == 0 {
            return Err(ConfigError::InvalidValue(
                "FLUSH_MAX_RECORDS must be at least 1".to_string(),
            ));
        }

        if self.flush_tick_ms == 0 || self.channel_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "FLUSH_TICK_MS and INTAKE_CHANNEL_BUFFER must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Window assigner for this configuration (call `validate` first)
    pub fn window_assigner(&self) -> WindowAssigner {
        WindowAssigner::new(self.window_minutes)
    }

    pub fn flush_scheduler(&self) -> FlushScheduler {
        FlushScheduler::new(
            TimeDelta::seconds(self.flush_interval_secs),
            self.flush_max_records,
        )
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 8] = [
        "SENSORFLOW_SINK",
        "SENSORFLOW_OUTPUT_DIR",
        "SENSORFLOW_DB_PATH",
        "WINDOW_MINUTES",
        "FLUSH_INTERVAL_SECS",
        "FLUSH_MAX_RECORDS",
        "FLUSH_TICK_MS",
        "INTAKE_CHANNEL_BUFFER",
    ];

    // Single test so env mutations never race with each other
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = AggregatorConfig::from_env().unwrap();
        assert_eq!(config.sink, SinkBackend::Json);
        assert_eq!(config.output_dir, "./processed-data");
        assert_eq!(config.db_path, "./sensorflow.db");
        assert_eq!(config.window_minutes, 5);
        assert_eq!(config.flush_interval_secs, 300);
        assert_eq!(config.flush_max_records, 100);
        assert_eq!(config.flush_tick_ms, 1_000);
        assert_eq!(config.channel_buffer, 10_000);
        assert!(config.validate().is_ok());

        env::set_var("SENSORFLOW_SINK", "SQLite");
        env::set_var("SENSORFLOW_DB_PATH", "/tmp/test.db");
        env::set_var("WINDOW_MINUTES", "15");
        env::set_var("FLUSH_MAX_RECORDS", "not-a-number");
        env::set_var("FLUSH_TICK_MS", "250");

        let config = AggregatorConfig::from_env().unwrap();
        assert_eq!(config.sink, SinkBackend::Sqlite);
        assert_eq!(config.db_path, "/tmp/test.db");
        assert_eq!(config.window_minutes, 15);
        assert_eq!(config.flush_max_records, 100);
        assert_eq!(config.flush_tick_ms, 250);

        env::set_var("SENSORFLOW_SINK", "blob");
        assert!(matches!(
            AggregatorConfig::from_env(),
            Err(ConfigError::InvalidValue(_))
        ));

        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AggregatorConfig {
            window_minutes: 7,
            ..AggregatorConfig::default()
        };
        assert!(config.validate().is_err());

        config.window_minutes = 10;
        config.flush_max_records = 0;
        assert!(config.validate().is_err());

        config.flush_max_records = 1;
        config.flush_interval_secs = 0;
        assert!(config.validate().is_err());

        config.flush_interval_secs = 60;
        assert!(config.validate().is_ok());
    }
}
