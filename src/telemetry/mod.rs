//! Pool telemetry.
//!
//! With the `telemetry` feature the pool counts submissions, executions,
//! panics, rejections and discards, and keeps latency histograms for task
//! execution and queue wait. Without it a no-op `Metrics` keeps the call
//! sites unchanged.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub mod export;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

#[cfg(feature = "telemetry")]
pub use export::{ConsoleExporter, JsonExporter, MetricsExporter};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_submitted(&self) {}
        pub fn record_rejected(&self) {}
        pub fn record_discarded(&self, _: usize) {}
        pub fn record_queue_wait(&self, _: u64) {}
        pub fn record_task_execution(&self, _: u64) {}
        pub fn record_task_panic(&self) {}
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::Metrics;
