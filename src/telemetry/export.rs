//! Metrics export functionality for various formats.

use super::metrics::MetricsSnapshot;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Trait for exporting metrics to different formats
pub trait MetricsExporter: Send + Sync {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Writes each snapshot as pretty-printed JSON to a file.
#[derive(Debug)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;

        std::fs::write(&self.output_path, json)?;

        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_submitted: u64,
    tasks_executed: u64,
    tasks_panicked: u64,
    tasks_rejected: u64,
    tasks_discarded: u64,
    busy_time_ms: u64,
    avg_latency_us: f64,
    p50_latency_us: f64,
    p99_latency_us: f64,
    max_latency_us: f64,
    avg_queue_wait_us: f64,
    p99_queue_wait_us: f64,
    tasks_per_second: f64,
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_submitted: snapshot.tasks_submitted,
            tasks_executed: snapshot.tasks_executed,
            tasks_panicked: snapshot.tasks_panicked,
            tasks_rejected: snapshot.tasks_rejected,
            tasks_discarded: snapshot.tasks_discarded,
            busy_time_ms: snapshot.busy_time_ns / 1_000_000,
            avg_latency_us: snapshot.avg_latency_ns as f64 / 1_000.0,
            p50_latency_us: snapshot.p50_latency_ns as f64 / 1_000.0,
            p99_latency_us: snapshot.p99_latency_ns as f64 / 1_000.0,
            max_latency_us: snapshot.max_latency_ns as f64 / 1_000.0,
            avg_queue_wait_us: snapshot.avg_queue_wait_ns as f64 / 1_000.0,
            p99_queue_wait_us: snapshot.p99_queue_wait_ns as f64 / 1_000.0,
            tasks_per_second: snapshot.tasks_per_second(),
        }
    }
}

/// Export metrics to stdout
#[derive(Debug, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl MetricsExporter for ConsoleExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        println!("=== taskpool metrics ===");
        println!("Uptime: {:.2}s", snapshot.uptime.as_secs_f64());
        println!("Tasks submitted: {}", snapshot.tasks_submitted);
        println!("Tasks executed: {}", snapshot.tasks_executed);
        println!("Tasks panicked: {}", snapshot.tasks_panicked);
        println!("Tasks rejected: {}", snapshot.tasks_rejected);
        println!("Tasks discarded: {}", snapshot.tasks_discarded);
        println!("Tasks/sec: {:.2}", snapshot.tasks_per_second());

        if self.verbose {
            println!("\nExecution latency:");
            println!("  Average: {:.2}μs", snapshot.avg_latency_ns as f64 / 1_000.0);
            println!("  P50: {:.2}μs", snapshot.p50_latency_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_latency_ns as f64 / 1_000.0);
            println!("  Max: {:.2}μs", snapshot.max_latency_ns as f64 / 1_000.0);

            println!("\nQueue wait:");
            println!("  Average: {:.2}μs", snapshot.avg_queue_wait_ns as f64 / 1_000.0);
            println!("  P99: {:.2}μs", snapshot.p99_queue_wait_ns as f64 / 1_000.0);
        }

        println!("========================");

        Ok(())
    }
}
