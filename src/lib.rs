//! taskpool - a fixed-size thread pool with typed result handles
//!
//! Work submitted to a [`ThreadPool`] is queued in a single FIFO and picked
//! up by one of a fixed number of long-lived worker threads. Every
//! submission returns a [`TaskHandle`] that yields the closure's return
//! value, or the panic it raised, once a worker has run it.
//!
//! # Quick Start
//!
//! ```no_run
//! use taskpool_rs::prelude::*;
//!
//! let pool = ThreadPool::new(4).unwrap();
//!
//! let answer = pool.submit(|| 6 * 7).unwrap();
//! let greeting = pool
//!     .submit_with(|name: &str| format!("hello, {}", name), "pool")
//!     .unwrap();
//!
//! assert_eq!(answer.get().unwrap(), 42);
//! assert_eq!(greeting.get().unwrap(), "hello, pool");
//!
//! pool.shutdown();
//! assert!(matches!(pool.submit(|| ()), Err(Error::PoolClosed)));
//! ```
//!
//! # Features
//!
//! - **Fixed workers**: threads are started up front and never resized
//! - **FIFO dispatch**: tasks leave the queue in submission order
//! - **Panic containment**: a panicking task fails its own handle, never its worker
//! - **Shutdown policies**: drain the queue or discard what is left
//! - **Telemetry**: counters and latency histograms (`telemetry`, on by default)
//! - **Async integration**: await handles from any executor (`async`)

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
pub mod prelude;
pub mod telemetry;

#[cfg(feature = "async")]
pub mod async_bridge;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, ShutdownPolicy};
pub use error::{Error, Result, TaskFailure};
pub use executor::{PanicStrategy, PoolState, TaskId, ThreadPool, WorkerStats, WorkerStatus};
pub use handle::{SharedTaskHandle, TaskHandle};

#[cfg(feature = "async")]
pub use async_bridge::block_on;
