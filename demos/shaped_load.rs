//! # Example: Shaped load
//!
//! Two generators against a fake service:
//! - `browse`: ramps 0 → 40 calls/sec over 5s, unlimited concurrency
//! - `checkout`: 5 calls/sec with a 30 calls/sec spike at t=4s, at most 4 in flight,
//!   a 150ms timeout and a 10% failure rate
//!
//! Prints `top` once a second for 10 seconds (Ctrl-C stops early).
//!
//! Run with: `cargo run --example shaped_load --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use loadvisor::{
    Config, GeneratorSpec, LoadShape, LoadVisor, LogWriter, SpawnRunner, Subscribe, TaskError,
};

/// Fake service call: 20-200ms latency, every tenth call fails.
async fn fake_call(n: u64) -> Result<(), TaskError> {
    tokio::time::sleep(Duration::from_millis(20 + (n * 37) % 180)).await;
    if n % 10 == 9 {
        return Err(TaskError::fail("503 service unavailable"));
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let visor = LoadVisor::builder(Config::default())
        .with_subscribers(subs)
        .build();

    let calls = Arc::new(AtomicU64::new(0));
    let browse = GeneratorSpec::builder(
        "browse",
        LoadShape::Ramp {
            from: 0.0,
            to: 40.0,
            over: Duration::from_secs(5),
        },
    )
    .build({
        let calls = Arc::clone(&calls);
        move || fake_call(calls.fetch_add(1, Ordering::Relaxed))
    });

    let checkout = GeneratorSpec::builder(
        "checkout",
        LoadShape::Spike {
            base: 5.0,
            peak: 30.0,
            at: Duration::from_secs(4),
            width: Duration::from_secs(2),
        },
    )
    .max_concurrent(4)
    .runner(SpawnRunner::with_timeout(Duration::from_millis(150)))
    .build({
        let calls = Arc::clone(&calls);
        move || fake_call(calls.fetch_add(1, Ordering::Relaxed))
    });

    for (name, res) in visor.add_batch(vec![browse, checkout]).await {
        res.map_err(|e| anyhow::anyhow!("add {name}: {e}"))?;
    }
    for (name, res) in visor.init(loadvisor::Target::All).await {
        res.map_err(|e| anyhow::anyhow!("init {name}: {e}"))?;
    }

    let report = async {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            for s in visor.top().await {
                println!(
                    "{:<9} {:<8} t={:>5.1}s in_flight={:<3} max={:<3} dispatched={:<4} skipped={:<4} ok={:<4} failed={}",
                    s.name,
                    s.state,
                    s.elapsed.as_secs_f64(),
                    s.in_flight,
                    s.max_concurrent,
                    s.stats.dispatched,
                    s.stats.skipped,
                    s.stats.completed,
                    s.stats.failed,
                );
            }
        }
    };

    tokio::select! {
        _ = report => visor.shutdown().await?,
        res = visor.shutdown_on_signal() => res?,
    }
    Ok(())
}
