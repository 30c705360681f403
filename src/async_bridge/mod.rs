//! Async/await support for task handles.
//!
//! With the `async` feature a [`TaskHandle`](crate::TaskHandle) can be
//! awaited from any executor instead of blocking a thread in `get()`.

mod handle_future;

pub use futures::executor::block_on;
