//! Pipeline ingestion - async channel processor for telemetry records
//!
//! Main loop:
//! 1. Receives records from the intake via mpsc channel
//! 2. Submits each record to the coordinator (which may flush inline)
//! 3. On a timer tick, asks the coordinator to flush if the interval elapsed
//! 4. On channel close, flushes whatever is left and returns

use super::engine::{AggregationCoordinator, FlushReport, SubmitOutcome};
use super::types::TelemetryRecord;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Counters for one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    pub received: u64,
    pub rejected: u64,
    pub flushes: u64,
    pub emitted: u64,
    pub failed: u64,
}

impl IngestionStats {
    fn record_flush(&mut self, report: FlushReport) {
        self.flushes += 1;
        self.emitted += report.emitted as u64;
        self.failed += report.failed as u64;
    }
}

/// Drive `coordinator` from a channel of decoded records
///
/// Arguments:
/// - `rx`: Receiver end of the record channel
/// - `coordinator`: Shared coordinator (other tasks may submit concurrently)
/// - `flush_tick_ms`: How often to re-check the flush policy with no new input
///
/// Runs until every sender is dropped, then performs a final flush.
pub async fn start_ingestion(
    mut rx: mpsc::Receiver<TelemetryRecord>,
    coordinator: Arc<AggregationCoordinator>,
    flush_tick_ms: u64,
) -> IngestionStats {
    log::info!("🚀 Starting telemetry ingestion");
    log::info!(
        "   ├─ Window: {} minutes",
        coordinator.buffer().assigner().window_minutes()
    );
    log::info!("   ├─ Flush tick: {}ms", flush_tick_ms);
    log::info!(
        "   ├─ Flush policy: every {}s or {} records",
        coordinator.scheduler().flush_interval().num_seconds(),
        coordinator.scheduler().max_buffered()
    );
    log::info!("   └─ Waiting for telemetry...");

    let mut flush_timer = interval(Duration::from_millis(flush_tick_ms));
    flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stats = IngestionStats::default();
    let mut last_log_time = std::time::Instant::now();
    let mut since_last_log = 0u64;

    loop {
        tokio::select! {
            maybe_record = rx.recv() => {
                let Some(record) = maybe_record else {
                    log::warn!("⚠️  Telemetry channel closed, stopping ingestion");
                    break;
                };

                stats.received += 1;
                since_last_log += 1;

                match coordinator.submit(record).await {
                    Ok(SubmitOutcome::Flushed(report)) => stats.record_flush(report),
                    Ok(SubmitOutcome::Buffered) => {}
                    Err(_) => stats.rejected += 1,
                }

                if last_log_time.elapsed().as_secs() >= 10 {
                    let per_sec = since_last_log as f64 / last_log_time.elapsed().as_secs_f64();
                    log::info!(
                        "📊 Ingestion rate: {:.1} records/sec (total: {}, buffered: {})",
                        per_sec,
                        stats.received,
                        coordinator.buffer().total_buffered_count()
                    );
                    last_log_time = std::time::Instant::now();
                    since_last_log = 0;
                }
            }

            _ = flush_timer.tick() => {
                if let Some(report) = coordinator.flush_if_due().await {
                    stats.record_flush(report);
                }
            }
        }
    }

    log::info!("🔄 Performing final flush...");
    let report = coordinator.flush_all().await;
    if report.windows > 0 {
        stats.record_flush(report);
    }

    log::info!(
        "✅ Ingestion stopped: {} received, {} rejected, {} aggregates written, {} failed",
        stats.received,
        stats.rejected,
        stats.emitted,
        stats.failed
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scheduler::FlushScheduler;
    use crate::pipeline::windows::WindowAssigner;
    use crate::sink::MemorySink;
    use chrono::{TimeDelta, Utc};

    fn make_record(sensor: &str, offset_secs: i64, value: f64) -> TelemetryRecord {
        TelemetryRecord::new(sensor, value, "celsius", Utc::now() + TimeDelta::seconds(offset_secs))
    }

    #[tokio::test]
    async fn test_ingestion_flushes_on_close() {
        let (tx, rx) = mpsc::channel(100);
        let sink = Arc::new(MemorySink::new());
        let coordinator = Arc::new(AggregationCoordinator::new(
            WindowAssigner::default(),
            FlushScheduler::default(),
            sink.clone(),
        ));

        let handle = tokio::spawn(start_ingestion(rx, coordinator.clone(), 1_000));

        for i in 0..10 {
            tx.send(make_record("s1", 0, i as f64)).await.unwrap();
        }
        tx.send(make_record("", 0, 1.0)).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();

        assert_eq!(stats.received, 11);
        assert_eq!(stats.rejected, 1);
        assert!(coordinator.buffer().is_empty());

        let total: usize = sink.aggregates().iter().map(|a| a.count).sum();
        assert_eq!(total, 10);
        assert_eq!(stats.emitted as usize, sink.len());
    }

    #[tokio::test]
    async fn test_ingestion_tick_flushes_idle_buffer() {
        let (tx, rx) = mpsc::channel(100);
        let sink = Arc::new(MemorySink::new());
        let coordinator = Arc::new(AggregationCoordinator::new(
            WindowAssigner::default(),
            FlushScheduler::new(TimeDelta::milliseconds(50), 1_000),
            sink.clone(),
        ));

        let handle = tokio::spawn(start_ingestion(rx, coordinator.clone(), 10));

        tx.send(make_record("s1", 0, 1.0)).await.unwrap();
        tx.send(make_record("s2", 0, 2.0)).await.unwrap();

        // No more input; the timer alone must drain the buffer
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(sink.len(), 2);
        assert!(coordinator.buffer().is_empty());

        drop(tx);
        let stats = handle.await.unwrap();
        assert_eq!(stats.emitted, 2);
    }
}
