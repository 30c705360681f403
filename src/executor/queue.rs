//! Shared FIFO of pending tasks.
//!
//! The task list and the stop flag live behind a single mutex. Every change
//! that could satisfy a waiting worker is made while that mutex is held and
//! the condvar is signalled afterwards, so a worker can never miss a wakeup
//! between checking the queue and going to sleep.

use super::task::Task;
use crate::config::ShutdownPolicy;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueState {
    tasks: VecDeque<Task>,
    stopping: bool,
}

pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a task and wake one idle worker.
    ///
    /// Fails with `PoolClosed` once the queue is closed; the task is dropped.
    pub fn push(&self, task: Task) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.stopping {
                return Err(Error::PoolClosed);
            }
            state.tasks.push_back(task);
        }

        self.available.notify_one();
        Ok(())
    }

    /// Block until a task is available or the queue is closed and empty.
    ///
    /// `None` is the shutdown signal: the caller should leave its loop.
    pub fn pop_blocking(&self) -> Option<Task> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.stopping {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Flip into the stopping state and wake every worker.
    ///
    /// Returns `None` if the queue was already closed. Under
    /// `ShutdownPolicy::Discard` the queued tasks are returned so the caller
    /// can drop them outside the lock.
    pub fn close(&self, policy: ShutdownPolicy) -> Option<Vec<Task>> {
        let discarded = {
            let mut state = self.state.lock();
            if state.stopping {
                return None;
            }
            state.stopping = true;
            match policy {
                ShutdownPolicy::Drain => Vec::new(),
                ShutdownPolicy::Discard => state.tasks.drain(..).collect(),
            }
        };

        self.available.notify_all();
        Some(discarded)
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().stopping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        let first = Task::new(|| {});
        let second = Task::new(|| {});
        let (a, b) = (first.id, second.id);

        queue.push(first).unwrap();
        queue.push(second).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_blocking().unwrap().id, a);
        assert_eq!(queue.pop_blocking().unwrap().id, b);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let queue = TaskQueue::new();
        assert!(queue.close(ShutdownPolicy::Drain).is_some());
        assert!(queue.is_closed());
        assert!(matches!(queue.push(Task::new(|| {})), Err(Error::PoolClosed)));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_close_twice_is_noop() {
        let queue = TaskQueue::new();
        assert!(queue.close(ShutdownPolicy::Drain).is_some());
        assert!(queue.close(ShutdownPolicy::Drain).is_none());
    }

    #[test]
    fn test_drain_keeps_queued_tasks() {
        let queue = TaskQueue::new();
        queue.push(Task::new(|| {})).unwrap();
        queue.push(Task::new(|| {})).unwrap();

        let discarded = queue.close(ShutdownPolicy::Drain).unwrap();
        assert!(discarded.is_empty());

        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn test_discard_hands_back_queued_tasks() {
        let queue = TaskQueue::new();
        queue.push(Task::new(|| {})).unwrap();
        queue.push(Task::new(|| {})).unwrap();

        let discarded = queue.close(ShutdownPolicy::Discard).unwrap();
        assert_eq!(discarded.len(), 2);
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn test_blocked_pop_wakes_on_push() {
        let queue = Arc::new(TaskQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                let task = queue.pop_blocking().unwrap();
                task.execute();
            })
        };

        thread::sleep(Duration::from_millis(20));
        let counter = ran.clone();
        queue
            .push(Task::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        consumer.join().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_wakes_every_waiter() {
        let queue = Arc::new(TaskQueue::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.pop_blocking().is_none())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close(ShutdownPolicy::Drain);

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
