//! Metrics collection for pool monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// One hour in nanoseconds
const HISTOGRAM_MAX_NS: u64 = 3_600_000_000_000;

fn new_histogram() -> Histogram<u64> {
    Histogram::new_with_max(HISTOGRAM_MAX_NS, 3).expect("histogram bounds are constant and valid")
}

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Task counters
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_rejected: AtomicU64,
    tasks_discarded: AtomicU64,

    busy_time_ns: AtomicU64,

    // Time spent running a task body
    execution_histogram: RwLock<Histogram<u64>>,
    // Time between push and pop
    queue_wait_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            tasks_discarded: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            execution_histogram: RwLock::new(new_histogram()),
            queue_wait_histogram: RwLock::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, count: usize) {
        self.tasks_discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_queue_wait(&self, wait_ns: u64) {
        if let Some(mut hist) = self.queue_wait_histogram.try_write() {
            let _ = hist.record(wait_ns.min(HISTOGRAM_MAX_NS));
        }
    }

    /// Record a finished task body and how long it ran.
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);

        if let Some(mut hist) = self.execution_histogram.try_write() {
            let _ = hist.record(duration_ns.min(HISTOGRAM_MAX_NS));
        }
    }

    pub fn record_task_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let execution = self.execution_histogram.read();
        let queue_wait = self.queue_wait_histogram.read();

        MetricsSnapshot {
            timestamp: Instant::now(),
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_latency_ns: if execution.len() > 0 {
                execution.mean() as u64
            } else {
                0
            },
            p50_latency_ns: execution.value_at_quantile(0.50),
            p99_latency_ns: execution.value_at_quantile(0.99),
            max_latency_ns: execution.max(),
            avg_queue_wait_ns: if queue_wait.len() > 0 {
                queue_wait.mean() as u64
            } else {
                0
            },
            p99_queue_wait_ns: queue_wait.value_at_quantile(0.99),
        }
    }

    pub fn reset(&self) {
        self.tasks_submitted.store(0, Ordering::Relaxed);
        self.tasks_executed.store(0, Ordering::Relaxed);
        self.tasks_panicked.store(0, Ordering::Relaxed);
        self.tasks_rejected.store(0, Ordering::Relaxed);
        self.tasks_discarded.store(0, Ordering::Relaxed);
        self.busy_time_ns.store(0, Ordering::Relaxed);

        self.execution_histogram.write().reset();
        self.queue_wait_histogram.write().reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: Instant,
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub tasks_panicked: u64,
    pub tasks_rejected: u64,
    pub tasks_discarded: u64,
    pub busy_time_ns: u64,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
    pub avg_queue_wait_ns: u64,
    pub p99_queue_wait_ns: u64,
}

impl MetricsSnapshot {
    /// Busy fraction of the available worker time (0.0 to 1.0).
    pub fn utilization(&self, num_threads: usize) -> f64 {
        let available = self.uptime.as_nanos() as f64 * num_threads as f64;
        if available == 0.0 {
            return 0.0;
        }
        (self.busy_time_ns as f64 / available).min(1.0)
    }

    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }

    /// Tasks accepted but not yet finished, panicked or discarded.
    pub fn in_flight(&self) -> u64 {
        self.tasks_submitted
            .saturating_sub(self.tasks_executed)
            .saturating_sub(self.tasks_discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_task_execution(1000);
        metrics.record_task_execution(2000);
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.tasks_rejected, 1);
        assert_eq!(snapshot.busy_time_ns, 3000);
        assert!(snapshot.avg_latency_ns > 0);
        assert_eq!(snapshot.in_flight(), 0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = Metrics::new();

        metrics.record_task_execution(1000);
        metrics.record_queue_wait(500);
        assert_eq!(metrics.snapshot().tasks_executed, 1);

        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_executed, 0);
        assert_eq!(snapshot.avg_queue_wait_ns, 0);
    }

    #[test]
    fn test_utilization() {
        let mut snapshot = Metrics::new().snapshot();
        snapshot.uptime = Duration::from_secs(1);
        snapshot.busy_time_ns = 1_000_000_000;

        assert_eq!(snapshot.utilization(2), 0.5);

        snapshot.busy_time_ns = 3_000_000_000;
        assert_eq!(snapshot.utilization(4), 0.75);
    }

    #[test]
    fn test_in_flight_accounts_for_discards() {
        let metrics = Metrics::new();
        for _ in 0..5 {
            metrics.record_submitted();
        }
        metrics.record_task_execution(10);
        metrics.record_discarded(3);

        assert_eq!(metrics.snapshot().in_flight(), 1);
    }
}
