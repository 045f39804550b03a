//! # loadvisor
//!
//! **Loadvisor** generates shaped synthetic load: named generators dispatch
//! instances of a user task at a time-varying rate, under a per-generator
//! concurrency ceiling, and can be started, paused, resized and removed
//! while the process runs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller(s) ── add / init / pause / remove / set_max_concurrent / list / top
//!        │
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  LoadVisor (control handle)                                       │
//! │  - mpsc<Command> ──► Registry actor (owns every generator record) │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │  Scheduler   │   │  Scheduler   │   │  Scheduler   │   one per running generator
//!  │ λ(t) → Tick  │   │ λ(t) → Tick  │   │ λ(t) → Tick  │
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!         │ Admission::try_acquire() → Permit
//!         ▼
//!   TaskRunner::dispatch(task, args, Completion) ──► task.run()
//!         │
//!         └─► Completion::finish(res) → stats, TaskFailed / TimeoutHit, permit released
//!
//!  Registry, schedulers and completions publish Events ──► Bus ──► subscribers
//! ```
//!
//! ### Generator lifecycle
//! ```text
//! add ──► Uninitialized ──init──► Running ──pause──► Paused ──init──► Running ...
//!              (auto_init)───────────▲      └─duration elapsed─► Paused (GeneratorCompleted)
//! remove (any state) ──► record discarded, in-flight tasks keep running
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Control**       | Register and drive generators by name.                        | [`LoadVisor`], [`Target`]                   |
//! | **Load shapes**   | Intensity curves (calls/sec over active time).                | [`LoadSpec`], [`LoadShape`], [`RateModel`]  |
//! | **Admission**     | Per-generator concurrency ceiling, drop-on-full.              | [`Admission`], [`Permit`]                   |
//! | **Runners**       | Pluggable dispatch strategies with timeout and panic capture. | [`TaskRunner`], [`SpawnRunner`], [`InlineRunner`] |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, reports).         | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for commands, rates, tasks and shutdown.         | [`RegistryError`], [`TaskError`]            |
//! | **Configuration** | Centralize runtime settings.                                  | [`Config`], [`GeneratorOptions`]            |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber writing through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use loadvisor::{Config, GeneratorSpec, LoadShape, LoadVisor, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn loadvisor::Subscribe>> = vec![Arc::new(loadvisor::LogWriter::default())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn loadvisor::Subscribe>> = Vec::new();
//!
//!     let visor = LoadVisor::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Ramp from 0 to 50 calls/sec over 10s, at most 8 calls in flight, stop after 30s.
//!     let spec = GeneratorSpec::builder(
//!         "checkout",
//!         LoadShape::Ramp { from: 0.0, to: 50.0, over: Duration::from_secs(10) },
//!     )
//!     .max_concurrent(8)
//!     .duration(Duration::from_secs(30))
//!     .auto_init(true)
//!     .build(|| async {
//!         tokio::time::sleep(Duration::from_millis(20)).await;
//!         Ok::<(), TaskError>(())
//!     });
//!
//!     visor.add(spec).await?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!
//!     for status in visor.top().await {
//!         println!("{} {} in_flight={}", status.name, status.state, status.in_flight);
//!     }
//!     visor.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod admission;
mod config;
mod core;
mod error;
mod events;
mod generator;
mod load;
mod runner;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use admission::{Admission, Permit};
pub use config::Config;
pub use crate::core::{LoadVisor, LoadVisorBuilder, Outcome, Target};
pub use error::{RateError, RegistryError, RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use generator::{
    GeneratorInfo, GeneratorOptions, GeneratorSpec, GeneratorSpecBuilder, GeneratorStats,
    GeneratorStatus, LifecycleState, StatsSnapshot,
};
pub use load::{LoadShape, LoadSpec, LoadSpecRef, RateModel, Tick};
pub use runner::{
    Completion, InlineRunner, RunnerArgs, RunnerRef, SpawnRunner, TaskRunner, execute,
};
pub use subscribers::Subscribe;
pub use tasks::{Task, TaskFn, TaskRef};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
