//! sensorflow - windowed telemetry aggregation
//!
//! See [`pipeline`] for the engine and [`sink`] for output backends.

pub mod intake;
pub mod pipeline;
pub mod sink;
