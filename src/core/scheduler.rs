//! # GeneratorScheduler: dispatch loop of one running generator.
//!
//! Turns the generator's load spec into dispatches:
//! - samples the next arrival from its [`RateModel`],
//! - sleeps cooperatively (cancellable via [`CancellationToken`]),
//! - asks [`Admission`] for a slot and hands the task to the runner,
//! - stops itself once the configured duration of active time has elapsed.
//!
//! ## Architecture
//! ```text
//! Registry::init ──► GeneratorScheduler::spawn(token, run_id)
//!
//! loop {
//!   ├─► elapsed = clock.elapsed() - lag behind next_at
//!   │     └─► elapsed >= duration → exit Completed
//!   ├─► rate.next_tick(load, elapsed)
//!   │     ├─► Err(InvalidRate) → publish InvalidRate, Recheck(idle_poll)
//!   │     └─► Fire(w) / Recheck(w), cut at the duration deadline
//!   ├─► next_at += w; select! { sleep_until(next_at), token.cancelled() → exit Stopped }
//!   └─► Fire:
//!         ├─► admission.try_acquire() → Some(permit) → runner.dispatch(task, args, Completion)
//!         └─► None → count skip; publish TaskSkipped on the first skip of a streak
//! }
//! ```
//!
//! ## Rules
//! - The loop never awaits a task instance unless the runner does so itself.
//! - Task failures are settled by the [`Completion`]; they never stop the loop.
//! - A self-stop (`Completed` or a panic) is reported to the registry actor,
//!   tagged with the run id; cancellation is not reported.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::admission::Admission;
use crate::core::clock::ActiveClock;
use crate::core::command::{Command, SchedulerExit};
use crate::error::{RateError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::generator::{GeneratorSpec, GeneratorStats};
use crate::load::{LoadSpecRef, RateModel, Tick};
use crate::runner::{Completion, RunnerArgs, RunnerRef};
use crate::tasks::TaskRef;

/// Shared per-generator state the scheduler works against.
pub(crate) struct SchedulerShared {
    pub admission: Arc<Admission>,
    pub stats: Arc<GeneratorStats>,
    pub bus: Bus,
}

/// Dispatch loop of one generator run.
pub(crate) struct GeneratorScheduler {
    name: Arc<str>,
    task: TaskRef,
    load: LoadSpecRef,
    runner: RunnerRef,
    runner_args: Option<RunnerArgs>,
    duration: Option<Duration>,
    shared: SchedulerShared,
    rate: RateModel,
    clock: ActiveClock,
    /// Set while ticks are being skipped at the ceiling.
    saturated: bool,
}

impl GeneratorScheduler {
    /// Creates a scheduler for `spec`; `clock` must already be started.
    pub(crate) fn new(
        spec: &GeneratorSpec,
        shared: SchedulerShared,
        rate: RateModel,
        clock: ActiveClock,
    ) -> Self {
        let opts = spec.options();
        Self {
            name: Arc::clone(spec.name_arc()),
            task: Arc::clone(spec.task()),
            load: Arc::clone(spec.load()),
            runner: Arc::clone(&opts.runner),
            runner_args: opts.runner_args.clone(),
            duration: opts.duration,
            shared,
            rate,
            clock,
            saturated: false,
        }
    }

    /// Spawns the loop; a self-stop is reported through `report`.
    ///
    /// `report` is weak so running schedulers never keep the registry's
    /// command queue open.
    pub(crate) fn spawn(
        self,
        token: CancellationToken,
        run_id: u64,
        report: mpsc::WeakSender<Command>,
    ) -> JoinHandle<()> {
        let name = Arc::clone(&self.name);
        tokio::spawn(async move {
            let exit = match AssertUnwindSafe(self.run(token.clone())).catch_unwind().await {
                Ok(exit) => exit,
                Err(payload) => SchedulerExit::Crashed {
                    info: panic_info(&*payload),
                },
            };
            if matches!(exit, SchedulerExit::Stopped) {
                return;
            }
            let Some(tx) = report.upgrade() else {
                return;
            };
            select! {
                _ = tx.send(Command::SchedulerExited { name, run_id, exit }) => {}
                _ = token.cancelled() => {}
            }
        })
    }

    /// Runs until cancelled or until the duration is used up.
    ///
    /// Arrivals live on an absolute timeline: `next_at` advances by each
    /// sampled wait, so timer rounding and dispatch overhead are made up by
    /// the following ticks instead of accumulating. The load spec is evaluated
    /// at the scheduled instant, not at the (possibly late) wake-up.
    async fn run(mut self, token: CancellationToken) -> SchedulerExit {
        let mut next_at = Instant::now();
        loop {
            if token.is_cancelled() {
                return SchedulerExit::Stopped;
            }

            let now = Instant::now();
            let mut lag = now.saturating_duration_since(next_at);
            if lag > self.rate.horizon() {
                // Too far behind (e.g. an inline runner blocked): drop the backlog.
                next_at = now;
                lag = Duration::ZERO;
            }

            let elapsed = self.clock.elapsed().saturating_sub(lag);
            let remaining = match self.duration {
                Some(limit) if elapsed >= limit => {
                    return SchedulerExit::Completed {
                        elapsed: self.clock.elapsed(),
                    };
                }
                Some(limit) => Some(limit - elapsed),
                None => None,
            };

            let tick = match self.rate.next_tick(&*self.load, elapsed) {
                Ok(tick) => tick,
                Err(err) => {
                    self.report_invalid_rate(&err, elapsed);
                    Tick::Recheck(self.rate.idle_poll())
                }
            };
            let tick = match remaining {
                Some(rem) if tick.wait() > rem => Tick::Recheck(rem),
                _ => tick,
            };

            next_at += tick.wait();
            select! {
                _ = time::sleep_until(next_at) => {}
                _ = token.cancelled() => return SchedulerExit::Stopped,
            }

            if let Tick::Fire(_) = tick {
                self.fire().await;
            }
        }
    }

    /// One dispatch opportunity: admit and hand over, or skip.
    ///
    /// Every skip is counted; only the first one after an admitted dispatch is
    /// published, so a saturated generator does not flood the bus.
    async fn fire(&mut self) {
        let shared = &self.shared;
        let Some(permit) = shared.admission.try_acquire() else {
            shared.stats.record_skipped();
            if std::mem::replace(&mut self.saturated, true) {
                return;
            }
            shared.bus.publish(
                Event::new(EventKind::TaskSkipped)
                    .with_generator(Arc::clone(&self.name))
                    .with_in_flight(shared.admission.in_flight()),
            );
            return;
        };

        self.saturated = false;
        shared.stats.record_dispatched();
        let done = Completion::new(
            Arc::clone(&self.name),
            Arc::clone(&shared.stats),
            shared.bus.clone(),
            permit,
        );
        self.runner
            .dispatch(Arc::clone(&self.task), self.runner_args.clone(), done)
            .await;
    }

    fn report_invalid_rate(&self, err: &RateError, elapsed: Duration) {
        self.shared.stats.record_invalid_rate();
        self.shared.bus.publish(
            Event::new(EventKind::InvalidRate)
                .with_generator(Arc::clone(&self.name))
                .with_reason(err.as_message())
                .with_elapsed(elapsed),
        );
    }
}
