//! Sensorflow Runtime - windowed telemetry aggregation
//!
//! Reads newline-delimited JSON telemetry on stdin, buffers it into
//! per-sensor windows, and writes one aggregate per window to the configured
//! sink. Exits after stdin closes and the remaining buffer is flushed.
//!
//! Usage:
//!   sensor-feed | cargo run --release --bin sensorflow_runtime
//!
//! Environment variables:
//!   SENSORFLOW_SINK - json | sqlite (default: json)
//!   SENSORFLOW_OUTPUT_DIR - JSON sink root (default: ./processed-data)
//!   SENSORFLOW_DB_PATH - SQLite database path (default: ./sensorflow.db)
//!   WINDOW_MINUTES - Window length (default: 5)
//!   FLUSH_INTERVAL_SECS - Max seconds between flushes (default: 300)
//!   FLUSH_MAX_RECORDS - Buffered records that force a flush (default: 100)
//!   FLUSH_TICK_MS - Idle flush check period (default: 1000)
//!   INTAKE_CHANNEL_BUFFER - Channel size (default: 10000)

use dotenv::dotenv;
use log::{error, info, warn};
use sensorflow::intake::parse_record_line;
use sensorflow::pipeline::{
    config::AggregatorConfig, engine::AggregationCoordinator, ingestion::start_ingestion,
    types::TelemetryRecord,
};
use sensorflow::sink::build_sink;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging (stdout stays free for piping)
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Sensorflow Runtime");
    info!("   └─ Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AggregatorConfig::from_env()?;
    config.validate()?;

    info!("✅ Configuration loaded");
    info!("   ├─ Sink: {}", config.sink.as_str());
    info!("   ├─ Window: {} minutes", config.window_minutes);
    info!(
        "   ├─ Flush: every {}s or {} records",
        config.flush_interval_secs, config.flush_max_records
    );
    info!("   ├─ Flush tick: {}ms", config.flush_tick_ms);
    info!("   └─ Channel buffer: {} records", config.channel_buffer);

    let sink = build_sink(&config)?;
    let coordinator = Arc::new(AggregationCoordinator::from_config(&config, sink));
    info!("✅ Aggregation coordinator created");

    let (tx, rx) = mpsc::channel::<TelemetryRecord>(config.channel_buffer);
    let ingestion = tokio::spawn(start_ingestion(
        rx,
        coordinator.clone(),
        config.flush_tick_ms,
    ));
    info!("   └─ ✅ Ingestion task spawned");

    info!("📥 Reading telemetry from stdin (close stdin to stop)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0u64;
    let mut bad_lines = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_record_line(&line) {
            Ok(record) => {
                if tx.send(record).await.is_err() {
                    error!("❌ Ingestion task stopped unexpectedly");
                    break;
                }
            }
            Err(e) => {
                bad_lines += 1;
                warn!("⚠️  Skipping line {}: {}", line_number, e);
            }
        }
    }

    // Closing the channel triggers the final flush
    drop(tx);

    let stats = ingestion.await?;

    info!("📊 Run summary:");
    info!("   ├─ Lines read: {}", line_number);
    info!("   ├─ Undecodable lines: {}", bad_lines);
    info!("   ├─ Records received: {}", stats.received);
    info!("   ├─ Records rejected: {}", stats.rejected);
    info!("   ├─ Flushes: {}", stats.flushes);
    info!("   ├─ Aggregates written: {}", stats.emitted);
    info!("   └─ Aggregates failed: {}", stats.failed);
    info!("✅ Sensorflow runtime stopped");

    Ok(())
}
