// worker thread loop
use super::panic_handler::PanicHandler;
use super::queue::TaskQueue;
use super::task::Task;
use crate::telemetry::Metrics;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type WorkerId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Executing,
    Terminated,
}

impl WorkerStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerStatus::Idle,
            1 => WorkerStatus::Executing,
            _ => WorkerStatus::Terminated,
        }
    }
}

// counters for each worker, shared with the pool
#[derive(Debug)]
pub(crate) struct WorkerState {
    status: AtomicU8,
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    busy_time_ns: AtomicU64,
}

impl WorkerState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(WorkerStatus::Idle as u8),
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
        }
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn stats(&self, id: WorkerId) -> WorkerStats {
        WorkerStats {
            id,
            status: WorkerStatus::from_u8(self.status.load(Ordering::Acquire)),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            busy_time: Duration::from_nanos(self.busy_time_ns.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: WorkerId,
    pub status: WorkerStatus,
    pub tasks_executed: u64,
    pub tasks_panicked: u64,
    pub busy_time: Duration,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    queue: Arc<TaskQueue>,
    panic_handler: Arc<PanicHandler>,
    state: Arc<WorkerState>,
    metrics: Option<Arc<Metrics>>,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        queue: Arc<TaskQueue>,
        panic_handler: Arc<PanicHandler>,
        state: Arc<WorkerState>,
    ) -> Self {
        Self {
            id,
            queue,
            panic_handler,
            state,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    // main loop: returns once the queue is closed and empty
    pub fn run(&self) {
        tracing::debug!(worker = self.id, "worker started");

        while let Some(task) = self.queue.pop_blocking() {
            self.execute_task(task);
        }

        self.state.set_status(WorkerStatus::Terminated);
        tracing::debug!(
            worker = self.id,
            executed = self.state.tasks_executed.load(Ordering::Relaxed),
            "worker terminated"
        );
    }

    fn execute_task(&self, task: Task) {
        let tid = task.id;
        let queue_wait = task.enqueued_at.elapsed();

        self.state.set_status(WorkerStatus::Executing);
        let start = Instant::now();

        // the queue lock is not held here
        let result = self.panic_handler.execute(move || task.execute());

        let duration_ns = start.elapsed().as_nanos() as u64;

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.state
            .busy_time_ns
            .fetch_add(duration_ns, Ordering::Relaxed);

        if let Some(ref metrics) = self.metrics {
            metrics.record_queue_wait(queue_wait.as_nanos() as u64);
            metrics.record_task_execution(duration_ns);
        }

        if let Err(failure) = result {
            self.state.tasks_panicked.fetch_add(1, Ordering::Relaxed);
            if let Some(ref metrics) = self.metrics {
                metrics.record_task_panic();
            }
            tracing::debug!(worker = self.id, task = %tid, message = %failure, "task failed");
        }

        self.state.set_status(WorkerStatus::Idle);
    }
}
