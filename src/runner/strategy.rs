//! # Task runner strategy.
//!
//! A [`TaskRunner`] decides *how* one admitted task instance executes: the
//! scheduler hands it the task, the generator's opaque [`RunnerArgs`] and a
//! [`Completion`] it must eventually settle.
//!
//! ## Rules
//! - [`Completion::finish`] records the outcome and releases the admission slot.
//! - Dropping a `Completion` without finishing also releases the slot, so a
//!   runner cannot leak capacity on any path (error, panic, cancellation).
//! - Task failures stay inside the runner; they never reach the scheduler.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time;

use crate::admission::Permit;
use crate::error::{TaskError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::generator::GeneratorStats;
use crate::tasks::{Task, TaskRef};

/// Shared handle to a runner strategy.
pub type RunnerRef = Arc<dyn TaskRunner>;

/// Dispatch strategy for task instances.
///
/// # Example
/// ```rust
/// use async_trait::async_trait;
/// use loadvisor::{Completion, RunnerArgs, TaskRef, TaskRunner};
///
/// /// Runs every instance twice before reporting.
/// struct Twice;
///
/// #[async_trait]
/// impl TaskRunner for Twice {
///     fn name(&self) -> &'static str { "twice" }
///
///     async fn dispatch(&self, task: TaskRef, _args: Option<RunnerArgs>, done: Completion) {
///         tokio::spawn(async move {
///             let first = task.run().await;
///             let res = match first {
///                 Ok(()) => task.run().await,
///                 err => err,
///             };
///             done.finish(res);
///         });
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Returns a short name reported by `list`.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Executes one admitted task instance.
    ///
    /// Awaited by the scheduler loop: fire-and-forget strategies should spawn
    /// and return immediately.
    async fn dispatch(&self, task: TaskRef, args: Option<RunnerArgs>, done: Completion);
}

/// Opaque per-generator value handed to the runner with every dispatch.
#[derive(Clone)]
pub struct RunnerArgs(Arc<dyn Any + Send + Sync>);

impl RunnerArgs {
    /// Wraps any value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for RunnerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RunnerArgs(..)")
    }
}

/// Completion callback of one task instance.
///
/// Holds the admission [`Permit`]; the slot is released when this value is
/// consumed by [`finish`](Self::finish) or dropped.
pub struct Completion {
    generator: Arc<str>,
    stats: Arc<GeneratorStats>,
    bus: Bus,
    _permit: Permit,
}

impl Completion {
    pub(crate) fn new(
        generator: Arc<str>,
        stats: Arc<GeneratorStats>,
        bus: Bus,
        permit: Permit,
    ) -> Self {
        Self {
            generator,
            stats,
            bus,
            _permit: permit,
        }
    }

    /// Name of the generator that dispatched this instance.
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Records the outcome and releases the admission slot.
    ///
    /// `Ok` and [`TaskError::Canceled`] count as completed; any other error is
    /// counted as failed and published as [`EventKind::TaskFailed`] (preceded
    /// by [`EventKind::TimeoutHit`] for timeouts).
    pub fn finish(self, res: Result<(), TaskError>) {
        match res {
            Ok(()) | Err(TaskError::Canceled) => self.stats.record_completed(),
            Err(err) => {
                self.stats.record_failed();
                if let TaskError::Timeout { timeout } = &err {
                    self.bus.publish(
                        Event::new(EventKind::TimeoutHit)
                            .with_generator(Arc::clone(&self.generator))
                            .with_timeout(*timeout),
                    );
                }
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_generator(Arc::clone(&self.generator))
                        .with_reason(err.to_string()),
                );
            }
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

/// Runs one task instance with an optional timeout, converting panics into
/// [`TaskError::Panicked`].
///
/// `timeout` of zero is treated as no timeout.
pub async fn execute(task: &dyn Task, timeout: Option<Duration>) -> Result<(), TaskError> {
    let guarded = async {
        match std::panic::AssertUnwindSafe(task.run()).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(TaskError::Panicked {
                info: panic_info(&*payload),
            }),
        }
    };

    match timeout.filter(|d| !d.is_zero()) {
        Some(dur) => match time::timeout(dur, guarded).await {
            Ok(res) => res,
            Err(_elapsed) => Err(TaskError::Timeout { timeout: dur }),
        },
        None => guarded.await,
    }
}
