pub use crate::config::{Config, ConfigBuilder, ShutdownPolicy};
pub use crate::error::{Error, Result, TaskFailure};
pub use crate::executor::{PanicStrategy, PoolState, ThreadPool};
pub use crate::handle::{SharedTaskHandle, TaskHandle};

#[cfg(feature = "telemetry")]
pub use crate::telemetry::{Metrics, MetricsSnapshot};

#[cfg(feature = "async")]
pub use crate::async_bridge::block_on;
