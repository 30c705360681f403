use super::panic_handler::PanicHandler;
use super::queue::TaskQueue;
use super::task::{Task, TaskId};
use super::worker::{Worker, WorkerId, WorkerState, WorkerStats};
use crate::config::{Config, ShutdownPolicy};
use crate::error::{Error, Result, TaskFailure};
use crate::handle::{result_channel, TaskHandle};
use crate::telemetry::Metrics;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[cfg(feature = "telemetry")]
use crate::telemetry::MetricsSnapshot;

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unknown"),
                core = core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// Lifecycle of a pool. Moves from `Running` to `Stopping` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Running,
    Stopping,
}

/// A fixed set of worker threads fed from one shared FIFO queue.
pub struct ThreadPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<WorkerHandle>>,
    worker_states: Vec<Arc<WorkerState>>,
    panic_handler: Arc<PanicHandler>,
    shutdown_policy: ShutdownPolicy,
    num_threads: usize,
    metrics: Option<Arc<Metrics>>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

impl ThreadPool {
    /// Start a pool of `num_threads` workers with default settings.
    pub fn new(num_threads: usize) -> Result<Self> {
        let config = Config::builder().num_threads(num_threads).build()?;
        Self::with_config(&config)
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let queue = Arc::new(TaskQueue::new());
        let panic_handler = Arc::new(PanicHandler::new(config.panic_strategy));

        #[cfg(feature = "telemetry")]
        let metrics = config.enable_telemetry.then(|| Arc::new(Metrics::new()));
        #[cfg(not(feature = "telemetry"))]
        let metrics = Some(Arc::new(Metrics::new()));

        let mut pool = Self {
            queue,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            worker_states: Vec::with_capacity(num_threads),
            panic_handler,
            shutdown_policy: config.shutdown_policy,
            num_threads,
            metrics,
        };

        for id in 0..num_threads {
            let state = Arc::new(WorkerState::new());
            let worker = Worker::new(
                id,
                pool.queue.clone(),
                pool.panic_handler.clone(),
                state.clone(),
            )
            .with_metrics(pool.metrics.clone());

            let name = format!("{}-{}", config.thread_name_prefix, id);
            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = config.pin_workers;
            let spawned = builder.spawn(move || {
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(id % num_cpus::get());
                }

                worker.run();
            });

            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // dropping the pool stops and joins whatever already started
                    drop(pool);
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            };

            pool.worker_states.push(state);
            pool.workers.get_mut().push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        tracing::info!(
            workers = num_threads,
            policy = ?config.shutdown_policy,
            "thread pool started"
        );

        Ok(pool)
    }

    /// Queue `f` and return a handle to its result.
    ///
    /// Never blocks. Fails with [`Error::PoolClosed`] once shutdown has begun,
    /// in which case `f` is dropped without running.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId::next();
        let (sender, handle) = result_channel(id);

        let task = Task::with_id(id, move || match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => sender.send(Ok(value)),
            Err(payload) => {
                sender.send(Err(TaskFailure::from_payload(&*payload)));
                // let the worker's panic handler count and report it
                resume_unwind(payload);
            }
        });

        self.enqueue(task)?;
        Ok(handle)
    }

    /// Bind `args` to `f` and submit the call. Pass a tuple for several arguments.
    pub fn submit_with<F, A, T>(&self, f: F, args: A) -> Result<TaskHandle<T>>
    where
        F: FnOnce(A) -> T + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        self.submit(move || f(args))
    }

    /// Fire-and-forget submission; panics are still contained by the worker.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Task::new(f))
    }

    fn enqueue(&self, task: Task) -> Result<()> {
        let id = task.id;
        match self.queue.push(task) {
            Ok(()) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_submitted();
                }
                Ok(())
            }
            Err(e) => {
                if let Some(ref metrics) = self.metrics {
                    metrics.record_rejected();
                }
                tracing::debug!(task = %id, "submit rejected, pool is stopping");
                Err(e)
            }
        }
    }

    /// Stop accepting work, wake every worker and join them.
    ///
    /// Only the first call does anything; later or concurrent calls return
    /// immediately. Queued tasks are run or dropped according to the
    /// configured [`ShutdownPolicy`].
    pub fn shutdown(&self) {
        let discarded = match self.queue.close(self.shutdown_policy) {
            Some(discarded) => discarded,
            None => return,
        };

        tracing::info!(
            policy = ?self.shutdown_policy,
            queued = self.queue.len(),
            discarded = discarded.len(),
            "thread pool shutting down"
        );

        if !discarded.is_empty() {
            if let Some(ref metrics) = self.metrics {
                metrics.record_discarded(discarded.len());
            }
            // dropping the tasks abandons their result handles
            drop(discarded);
        }

        let handles = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();

        for mut handle in handles {
            let Some(thread) = handle.thread.take() else {
                continue;
            };

            if thread.thread().id() == current {
                tracing::warn!(
                    worker = handle.id,
                    "shutdown called from a worker thread; it will exit after its current task"
                );
                continue;
            }

            if thread.join().is_err() {
                tracing::error!(worker = handle.id, "worker thread panicked");
            }
        }

        tracing::info!("thread pool stopped");
    }

    pub fn state(&self) -> PoolState {
        if self.queue.is_closed() {
            PoolState::Stopping
        } else {
            PoolState::Running
        }
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Tasks waiting in the queue, not counting ones already running.
    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Number of task bodies that panicked so far.
    pub fn panic_count(&self) -> usize {
        self.panic_handler.panic_count()
    }

    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.worker_states
            .iter()
            .enumerate()
            .map(|(id, state)| state.stats(id))
            .collect()
    }

    #[cfg(feature = "telemetry")]
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .field("state", &self.state())
            .field("queued_tasks", &self.queued_tasks())
            .field("shutdown_policy", &self.shutdown_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PanicStrategy;
    use crate::executor::WorkerStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn quiet_pool(n: usize, policy: ShutdownPolicy) -> ThreadPool {
        let config = Config::builder()
            .num_threads(n)
            .shutdown_policy(policy)
            .panic_strategy(PanicStrategy::Isolate)
            .build()
            .unwrap();
        ThreadPool::with_config(&config).unwrap()
    }

    #[test]
    fn test_zero_workers_is_config_error() {
        assert!(matches!(ThreadPool::new(0), Err(Error::Config(_))));
    }

    #[test]
    fn test_submit_returns_value() {
        let pool = ThreadPool::new(2).unwrap();
        let handle = pool.submit(|| 6 * 7).unwrap();
        assert_eq!(handle.get().unwrap(), 42);
    }

    #[test]
    fn test_submit_with_binds_arguments() {
        let pool = ThreadPool::new(1).unwrap();
        let handle = pool
            .submit_with(|(a, b): (i32, String)| format!("{}-{}", b, a), (9, "id".to_string()))
            .unwrap();
        assert_eq!(handle.get().unwrap(), "id-9");
    }

    #[test]
    fn test_execute_runs_without_handle() {
        let pool = ThreadPool::new(2).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.execute(move || tx.send(5).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 5);
    }

    #[test]
    fn test_panic_routed_to_handle() {
        let pool = quiet_pool(1, ShutdownPolicy::Drain);

        let failing = pool.submit(|| -> u32 { panic!("division by zero") }).unwrap();
        let healthy = pool.submit(|| 1u32).unwrap();

        match failing.get() {
            Err(Error::TaskFailed(failure)) => assert_eq!(failure.message(), "division by zero"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(healthy.get().unwrap(), 1);
        assert_eq!(pool.panic_count(), 1);
    }

    #[test]
    fn test_logged_panic_keeps_pool_alive() {
        let config = Config::builder()
            .num_threads(1)
            .panic_strategy(PanicStrategy::LogAndContinue)
            .build()
            .unwrap();
        let pool = ThreadPool::with_config(&config).unwrap();

        let failing = pool.submit(|| -> u32 { panic!("logged") }).unwrap();
        assert!(matches!(failing.get(), Err(Error::TaskFailed(_))));

        assert_eq!(pool.submit(|| 2u32).unwrap().get().unwrap(), 2);
        assert_eq!(pool.state(), PoolState::Running);
    }

    // no address space can hold this stack, so the OS refuses the thread
    #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
    #[test]
    fn test_spawn_failure_is_executor_error() {
        let config = Config::builder()
            .num_threads(2)
            .stack_size(1usize << 62)
            .build()
            .unwrap();

        let start = std::time::Instant::now();
        match ThreadPool::with_config(&config) {
            Err(Error::Executor(message)) => assert!(message.contains("spawn failed")),
            other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        let result = pool.submit(move || flag.fetch_add(1, Ordering::SeqCst));

        assert!(matches!(result, Err(Error::PoolClosed)));
        assert!(matches!(pool.execute(|| {}), Err(Error::PoolClosed)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(pool.state(), PoolState::Stopping);
    }

    #[test]
    fn test_shutdown_twice_is_noop() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool
            .worker_stats()
            .iter()
            .all(|s| s.status == WorkerStatus::Terminated));
    }

    #[test]
    fn test_drain_runs_queued_tasks() {
        let pool = quiet_pool(1, ShutdownPolicy::Drain);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        // hold the only worker so the rest stay queued
        let blocker = pool
            .submit(move || {
                let _ = gate_rx.recv_timeout(Duration::from_secs(5));
            })
            .unwrap();

        let handles: Vec<_> = (0..10).map(|i| pool.submit(move || i).unwrap()).collect();

        gate_tx.send(()).unwrap();
        pool.shutdown();

        blocker.get().unwrap();
        let values: Vec<i32> = handles.into_iter().map(|h| h.get().unwrap()).collect();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_discard_abandons_queued_tasks() {
        let pool = Arc::new(quiet_pool(1, ShutdownPolicy::Discard));
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        let blocker = pool
            .submit(move || {
                started_tx.send(()).unwrap();
                let _ = gate_rx.recv_timeout(Duration::from_secs(5));
                "finished"
            })
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let queued: Vec<_> = (0..5).map(|i| pool.submit(move || i).unwrap()).collect();
        assert_eq!(pool.queued_tasks(), 5);

        let stopper = {
            let pool = pool.clone();
            thread::spawn(move || pool.shutdown())
        };

        // the running task is never dropped
        for handle in queued {
            assert!(matches!(handle.get(), Err(Error::TaskAbandoned)));
        }
        gate_tx.send(()).unwrap();
        stopper.join().unwrap();

        assert_eq!(blocker.get().unwrap(), "finished");
    }

    #[test]
    fn test_shutdown_from_inside_task() {
        let pool = Arc::new(ThreadPool::new(2).unwrap());
        let inner = pool.clone();

        let handle = pool.submit(move || inner.shutdown()).unwrap();
        handle.get().unwrap();

        assert_eq!(pool.state(), PoolState::Stopping);
        assert!(matches!(pool.submit(|| ()), Err(Error::PoolClosed)));
    }

    #[test]
    fn test_worker_stats_count_tasks() {
        let pool = quiet_pool(3, ShutdownPolicy::Drain);
        let handles: Vec<_> = (0..30).map(|i| pool.submit(move || i * 2).unwrap()).collect();
        for handle in handles {
            handle.get().unwrap();
        }
        pool.shutdown();

        let stats = pool.worker_stats();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.iter().map(|s| s.tasks_executed).sum::<u64>(), 30);
    }

    #[cfg(feature = "telemetry")]
    #[test]
    fn test_metrics_snapshot() {
        let pool = quiet_pool(2, ShutdownPolicy::Drain);
        let ok = pool.submit(|| 1).unwrap();
        let bad = pool.submit(|| -> i32 { panic!("nope") }).unwrap();
        ok.get().unwrap();
        assert!(bad.get().is_err());
        pool.shutdown();
        let _ = pool.submit(|| 2);

        let snapshot = pool.metrics().unwrap();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.tasks_panicked, 1);
        assert_eq!(snapshot.tasks_rejected, 1);
    }
}
