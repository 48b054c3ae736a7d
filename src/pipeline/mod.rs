//! # Windowed Aggregation Engine
//!
//! Buffers telemetry per (sensor, 5-minute window), decides when to flush, and
//! turns each flushed bucket into order-independent summary statistics.
//!
//! ## Architecture
//!
//! ```text
//! intake ──▶ ingestion loop ──▶ AggregationCoordinator::submit()
//!                                   │
//!                                   ├─ WindowAssigner   (timestamp → window start)
//!                                   ├─ AggregationBuffer (single-lock bucket map)
//!                                   ├─ FlushScheduler   (age / size policy)
//!                                   └─ summarize()      (avg, min, max, stddev, count)
//!                                          │
//!                                          ▼
//!                                    AggregateSink::emit()
//! ```
//!
//! ## Guarantees
//!
//! - A record lands in exactly one drain (no loss, no duplicates)
//! - Concurrent callers that all observe "flush due" cause one drain
//! - Sink I/O never runs while the buffer lock is held
//! - A bucket whose sink write fails is logged and dropped, not re-buffered
//!
//! In-flight buckets live only in memory; a crash loses whatever has not been
//! flushed yet.
//!
//! ## Module Organization
//!
//! - `types` - TelemetryRecord, WindowKey, AggregateResult, MalformedRecord
//! - `windows` - Window assignment
//! - `buffer` - Concurrent bucket map with atomic drain
//! - `scheduler` - Flush policy
//! - `stats` - Summary statistics
//! - `engine` - Coordinator tying the above to a sink
//! - `ingestion` - Channel-driven runtime loop
//! - `config` - Environment configuration

pub mod buffer;
pub mod config;
pub mod engine;
pub mod ingestion;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod windows;

pub use buffer::{AggregationBuffer, DrainedBuckets};
pub use config::{AggregatorConfig, ConfigError, SinkBackend};
pub use engine::{AggregationCoordinator, FlushReport, SubmitOutcome};
pub use ingestion::{start_ingestion, IngestionStats};
pub use scheduler::FlushScheduler;
pub use stats::{summarize, Summary};
pub use types::{AggregateResult, MalformedRecord, TelemetryRecord, WindowKey};
pub use windows::WindowAssigner;
