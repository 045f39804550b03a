//! # LoadVisor: control handle of the load generation runtime.
//!
//! [`LoadVisor`] is the public face of the registry actor. Every method sends
//! one command and awaits its reply, so operations from many callers are
//! applied one at a time in arrival order.
//!
//! ## Architecture
//! ```text
//! LoadVisor::builder(cfg).with_subscribers(subs).build()
//!     ├─► Registry actor   (mpsc<Command>, owns all generators)
//!     └─► subscriber listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!
//! add / add_batch / init / pause / remove / set_max_concurrent / ...
//!     └─► Command { reply: oneshot } ──► Registry ──► reply
//!
//! shutdown()
//!     ├─► Bus.publish(ShutdownRequested)
//!     ├─► runtime_token.cancel() → every scheduler stops (bounded by cfg.grace)
//!     └─► listener drains buffered events, SubscriberSet::shutdown()
//! ```
//!
//! ## Rules
//! - After shutdown (or if the actor is gone) commands report [`RegistryError::Closed`].
//! - Lifecycle commands return one [`Outcome`] per requested name, in request
//!   order; [`Target::All`] resolves to every current name, sorted.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use loadvisor::{Config, GeneratorSpec, LoadShape, LoadVisor, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let visor = LoadVisor::builder(Config::default()).build();
//!
//!     let spec = GeneratorSpec::builder("ping", LoadShape::Constant(20.0))
//!         .max_concurrent(4)
//!         .build(|| async {
//!             tokio::time::sleep(Duration::from_millis(5)).await;
//!             Ok::<(), TaskError>(())
//!         });
//!
//!     visor.add(spec).await?;
//!     for (name, res) in visor.init("ping").await {
//!         res.map_err(|e| format!("{name}: {e}"))?;
//!     }
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     assert!(visor.is_running("ping").await);
//!
//!     visor.shutdown().await?;
//!     Ok(())
//! }
//! ```

use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::builder::LoadVisorBuilder;
use crate::core::command::{Command, Lifecycle, Outcome, Target};
use crate::core::shutdown;
use crate::error::{RegistryError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::generator::{GeneratorInfo, GeneratorSpec, GeneratorStatus};

/// Background tasks owned by a [`LoadVisor`].
pub(crate) struct Background {
    pub registry: JoinHandle<Result<(), RuntimeError>>,
    pub listener: Option<JoinHandle<()>>,
    pub listener_token: CancellationToken,
}

/// Handle to a running set of load generators.
pub struct LoadVisor {
    cfg: Config,
    bus: Bus,
    tx: mpsc::Sender<Command>,
    runtime_token: CancellationToken,
    background: Mutex<Option<Background>>,
}

impl LoadVisor {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        tx: mpsc::Sender<Command>,
        runtime_token: CancellationToken,
        background: Background,
    ) -> Self {
        Self {
            cfg,
            bus,
            tx,
            runtime_token,
            background: Mutex::new(Some(background)),
        }
    }

    /// Creates a builder; see [`LoadVisorBuilder`].
    pub fn builder(cfg: Config) -> LoadVisorBuilder {
        LoadVisorBuilder::new(cfg)
    }

    /// Returns the configuration this runtime was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Registers a generator; starts it right away when `auto_init` is set.
    ///
    /// Fails with [`RegistryError::Duplicated`] if the name is taken (the
    /// existing generator is left untouched).
    pub async fn add(&self, spec: GeneratorSpec) -> Result<(), RegistryError> {
        self.request(|reply| Command::Add { spec, reply }).await?
    }

    /// Registers several generators as one command.
    ///
    /// Each spec is added independently; one failure never aborts the rest.
    pub async fn add_batch(&self, specs: Vec<GeneratorSpec>) -> Vec<Outcome> {
        let names: Vec<String> = specs.iter().map(|s| s.name().to_string()).collect();
        match self.request(|reply| Command::AddBatch { specs, reply }).await {
            Ok(out) => out,
            Err(err) => closed(names, err),
        }
    }

    /// Starts (or resumes) the targeted generators.
    pub async fn init(&self, target: impl Into<Target>) -> Vec<Outcome> {
        self.lifecycle(Lifecycle::Init, target.into()).await
    }

    /// Stops the targeted schedulers; in-flight tasks run to completion.
    ///
    /// Pausing a generator that is not running is a no-op.
    pub async fn pause(&self, target: impl Into<Target>) -> Vec<Outcome> {
        self.lifecycle(Lifecycle::Pause, target.into()).await
    }

    /// Stops and discards the targeted generators; their names become reusable.
    pub async fn remove(&self, target: impl Into<Target>) -> Vec<Outcome> {
        self.lifecycle(Lifecycle::Remove, target.into()).await
    }

    /// Changes the concurrency ceiling of a generator (`0` = unlimited).
    ///
    /// Lowering it below the in-flight count cancels nothing.
    pub async fn set_max_concurrent(&self, name: &str, n: usize) -> Result<(), RegistryError> {
        let name = name.to_string();
        self.request(|reply| Command::SetMaxConcurrent { name, n, reply })
            .await?
    }

    /// Returns the concurrency ceiling of a generator.
    pub async fn get_max_concurrent(&self, name: &str) -> Result<usize, RegistryError> {
        let name = name.to_string();
        self.request(|reply| Command::GetMaxConcurrent { name, reply })
            .await?
    }

    /// True if the generator exists and its scheduler is active.
    pub async fn is_running(&self, name: &str) -> bool {
        let name = name.to_string();
        self.request(|reply| Command::IsRunning { name, reply })
            .await
            .unwrap_or(false)
    }

    /// Snapshot of every generator's configuration and state, sorted by name.
    pub async fn list(&self) -> Vec<GeneratorInfo> {
        self.request(|reply| Command::List { reply })
            .await
            .unwrap_or_default()
    }

    /// Snapshot of every generator's live counters, sorted by name.
    pub async fn top(&self) -> Vec<GeneratorStatus> {
        self.request(|reply| Command::Top { reply })
            .await
            .unwrap_or_default()
    }

    /// Returns a raw receiver of runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Stops every generator and the subscriber workers.
    ///
    /// Waits up to [`Config::grace`] for scheduler loops to exit; later calls
    /// return `Ok(())` immediately.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let Some(bg) = self.background.lock().await.take() else {
            return Ok(());
        };

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let res = match bg.registry.await {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = %err, "registry task failed");
                Ok(())
            }
        };

        bg.listener_token.cancel();
        if let Some(listener) = bg.listener {
            let _ = listener.await;
        }
        res
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    pub async fn shutdown_on_signal(&self) -> Result<(), RuntimeError> {
        shutdown::wait_for_shutdown_signal()
            .await
            .map_err(|err| RuntimeError::Signal {
                reason: err.to_string(),
            })?;
        self.shutdown().await
    }

    async fn lifecycle(&self, op: Lifecycle, target: Target) -> Vec<Outcome> {
        let names = match &target {
            Target::All => Vec::new(),
            Target::One(name) => vec![name.clone()],
            Target::Many(names) => names.clone(),
        };
        match self
            .request(|reply| Command::Lifecycle { op, target, reply })
            .await
        {
            Ok(out) => out,
            Err(err) => closed(names, err),
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RegistryError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| RegistryError::Closed)?;
        rx.await.map_err(|_| RegistryError::Closed)
    }
}

fn closed(names: Vec<String>, err: RegistryError) -> Vec<Outcome> {
    tracing::warn!(error = %err, "command not applied");
    names.into_iter().map(|n| (n, Err(err.clone()))).collect()
}
