//! Task execution infrastructure.
//!
//! This module provides the shared task queue, the worker loop, panic
//! containment, and the fixed-size [`ThreadPool`] that ties them together.

pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

mod queue;

pub use panic_handler::PanicStrategy;
pub use pool::{PoolState, ThreadPool};
pub use task::TaskId;
pub use worker::{WorkerId, WorkerStats, WorkerStatus};
