use crate::error::TaskFailure;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a worker reports a task body that panics.
///
/// The panic is always contained: the worker keeps running and the failure
/// reaches the task's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStrategy {
    /// Contain the panic silently; it is only visible through the task handle.
    Isolate,
    /// Contain the panic and log it at warn level.
    LogAndContinue,
}

impl Default for PanicStrategy {
    fn default() -> Self {
        PanicStrategy::LogAndContinue
    }
}

#[derive(Debug)]
pub(crate) struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    pub fn execute<F, R>(&self, f: F) -> Result<R, TaskFailure>
    where
        F: FnOnce() -> R,
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => Ok(result),
            Err(panic_payload) => {
                self.panic_count.fetch_add(1, Ordering::Relaxed);

                let failure = TaskFailure::from_payload(&*panic_payload);

                if self.strategy == PanicStrategy::LogAndContinue {
                    tracing::warn!(
                        thread = std::thread::current().name().unwrap_or("unnamed"),
                        message = %failure,
                        "task panicked"
                    );
                }

                Err(failure)
            }
        }
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }
}
