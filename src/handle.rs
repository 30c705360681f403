//! One-shot result channel between a running task and its submitter.
//!
//! [`ResultSender`] is moved into the queued closure and written exactly once
//! by the worker that runs it. [`TaskHandle`] stays with the caller and reads
//! the outcome once; [`SharedTaskHandle`] lets any number of readers observe
//! a cloned outcome. If the sender is dropped without writing (the task was
//! discarded at shutdown) readers see [`Error::TaskAbandoned`] instead of
//! blocking forever.

use crate::error::{Error, Result, TaskFailure};
use crate::executor::TaskId;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "async")]
use std::task::Waker;

pub(crate) enum SlotState<T> {
    Pending,
    Ready(T),
    Failed(TaskFailure),
    Abandoned,
    Consumed,
}

impl<T> SlotState<T> {
    fn is_pending(&self) -> bool {
        matches!(self, SlotState::Pending)
    }

    /// Move the outcome out, leaving `Consumed` behind. `None` while pending.
    pub(crate) fn take(&mut self) -> Option<Result<T>> {
        match std::mem::replace(self, SlotState::Consumed) {
            SlotState::Pending => {
                *self = SlotState::Pending;
                None
            }
            SlotState::Ready(value) => Some(Ok(value)),
            SlotState::Failed(failure) => Some(Err(Error::TaskFailed(failure))),
            SlotState::Abandoned => {
                *self = SlotState::Abandoned;
                Some(Err(Error::TaskAbandoned))
            }
            SlotState::Consumed => Some(Err(Error::ResultConsumed)),
        }
    }
}

impl<T: Clone> SlotState<T> {
    fn observe(&self) -> Option<Result<T>> {
        match self {
            SlotState::Pending => None,
            SlotState::Ready(value) => Some(Ok(value.clone())),
            SlotState::Failed(failure) => Some(Err(Error::TaskFailed(failure.clone()))),
            SlotState::Abandoned => Some(Err(Error::TaskAbandoned)),
            SlotState::Consumed => Some(Err(Error::ResultConsumed)),
        }
    }
}

pub(crate) struct SlotInner<T> {
    pub(crate) state: SlotState<T>,
    #[cfg(feature = "async")]
    pub(crate) waker: Option<Waker>,
}

pub(crate) struct Slot<T> {
    pub(crate) inner: Mutex<SlotInner<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Pending,
                #[cfg(feature = "async")]
                waker: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Store a terminal state if still pending, then wake every reader.
    fn complete(&self, terminal: SlotState<T>) {
        #[cfg(feature = "async")]
        let waker;
        {
            let mut inner = self.inner.lock();
            if !inner.state.is_pending() {
                return;
            }
            inner.state = terminal;

            #[cfg(feature = "async")]
            {
                waker = inner.waker.take();
            }
        }

        self.ready.notify_all();

        #[cfg(feature = "async")]
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn wait_ready(&self) -> parking_lot::MutexGuard<'_, SlotInner<T>> {
        let mut inner = self.inner.lock();
        while inner.state.is_pending() {
            self.ready.wait(&mut inner);
        }
        inner
    }

    /// Wait until the slot leaves `Pending` or `timeout` elapses.
    ///
    /// A timeout too large to express as a deadline waits without one.
    fn wait_ready_for(&self, timeout: Duration) -> parking_lot::MutexGuard<'_, SlotInner<T>> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return self.wait_ready(),
        };

        let mut inner = self.inner.lock();
        while inner.state.is_pending() {
            if self.ready.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
        }
        inner
    }
}

/// Create a connected sender/handle pair for the task `id`.
pub(crate) fn result_channel<T>(id: TaskId) -> (ResultSender<T>, TaskHandle<T>) {
    let slot = Arc::new(Slot::new());
    (
        ResultSender {
            slot: slot.clone(),
            sent: false,
        },
        TaskHandle { id, slot },
    )
}

/// Write half of the channel, owned by the queued task.
pub(crate) struct ResultSender<T> {
    slot: Arc<Slot<T>>,
    sent: bool,
}

impl<T> ResultSender<T> {
    pub fn send(mut self, outcome: std::result::Result<T, TaskFailure>) {
        self.sent = true;
        let terminal = match outcome {
            Ok(value) => SlotState::Ready(value),
            Err(failure) => SlotState::Failed(failure),
        };
        self.slot.complete(terminal);
    }
}

impl<T> Drop for ResultSender<T> {
    fn drop(&mut self) {
        if !self.sent {
            self.slot.complete(SlotState::Abandoned);
        }
    }
}

/// Handle to the eventual result of a submitted task.
///
/// The value can be taken exactly once. Use [`TaskHandle::shared`] when
/// several parties need to see it.
pub struct TaskHandle<T> {
    id: TaskId,
    pub(crate) slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True once the task has finished, failed or been abandoned.
    pub fn is_ready(&self) -> bool {
        !self.slot.inner.lock().state.is_pending()
    }

    /// Block until the task completes and return its outcome.
    pub fn get(self) -> Result<T> {
        let mut inner = self.slot.wait_ready();
        inner.state.take().unwrap_or(Err(Error::TaskAbandoned))
    }

    /// Take the outcome if it is available; `None` while still pending.
    pub fn try_get(&mut self) -> Option<Result<T>> {
        self.slot.inner.lock().state.take()
    }

    /// Like [`TaskHandle::try_get`] but waits up to `timeout` first.
    pub fn get_timeout(&mut self, timeout: Duration) -> Option<Result<T>> {
        self.slot.wait_ready_for(timeout).state.take()
    }
}

impl<T: Clone> TaskHandle<T> {
    /// Turn this handle into one that can be cloned and read repeatedly.
    pub fn shared(self) -> SharedTaskHandle<T> {
        SharedTaskHandle {
            id: self.id,
            slot: self.slot,
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Read-many view of a task result; every reader gets a clone.
pub struct SharedTaskHandle<T> {
    id: TaskId,
    slot: Arc<Slot<T>>,
}

impl<T: Clone> SharedTaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        !self.slot.inner.lock().state.is_pending()
    }

    pub fn get(&self) -> Result<T> {
        let inner = self.slot.wait_ready();
        inner.state.observe().unwrap_or(Err(Error::TaskAbandoned))
    }

    pub fn try_get(&self) -> Option<Result<T>> {
        self.slot.inner.lock().state.observe()
    }

    pub fn get_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        self.slot.wait_ready_for(timeout).state.observe()
    }
}

impl<T> Clone for SharedTaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for SharedTaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTaskHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
