//! Submits a mix of work to a small pool and prints the results.
//!
//! Run with `RUST_LOG=taskpool_rs=debug cargo run --example basic_pool`.

use std::time::Duration;
use taskpool_rs::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn fib(n: u64) -> u64 {
    if n < 2 {
        n
    } else {
        fib(n - 1) + fib(n - 2)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskpool_rs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::builder()
        .num_threads(4)
        .thread_name_prefix("demo")
        .build()?;
    let pool = ThreadPool::with_config(&config)?;

    let fibs: Vec<_> = (20..30u64)
        .map(|n| pool.submit_with(|n| (n, fib(n)), n))
        .collect::<Result<_>>()?;

    let slow = pool.submit(|| {
        std::thread::sleep(Duration::from_millis(50));
        "slow task done"
    })?;
    let broken = pool.submit(|| -> u32 { panic!("demo failure") })?;

    for handle in fibs {
        let (n, value) = handle.get()?;
        println!("fib({}) = {}", n, value);
    }
    println!("{}", slow.get()?);

    match broken.get() {
        Err(Error::TaskFailed(failure)) => println!("task failed as expected: {}", failure),
        other => println!("unexpected: {:?}", other),
    }

    pool.shutdown();

    #[cfg(feature = "telemetry")]
    if let Some(snapshot) = pool.metrics() {
        use taskpool_rs::telemetry::{ConsoleExporter, MetricsExporter};
        ConsoleExporter::new(true).export(&snapshot)?;
    }

    Ok(())
}
