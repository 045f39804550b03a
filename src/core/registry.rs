//! # Registry actor: single owner of every generator record.
//!
//! All control commands funnel through one bounded `mpsc` queue into
//! [`Registry::run`], which applies them one at a time. Each command is
//! therefore atomic with respect to every other command, and callers observe
//! a serial history without any lock around the generator map.
//!
//! ## Architecture
//! ```text
//! LoadVisor ──Command{reply}──► mpsc ──► Registry::run()
//!                                           ├─► Add / AddBatch      → insert record (+ auto init)
//!                                           ├─► Lifecycle(op, tgt)  → init / pause / remove per name
//!                                           ├─► SetMax / GetMax     → admission ceiling
//!                                           ├─► IsRunning/List/Top  → snapshots
//!                                           └─► SchedulerExited     → Running → Paused (run id checked)
//!
//! init(name):
//!   clock.start() ─► child token ─► GeneratorScheduler::spawn(token, run_id)
//! pause(name) / remove(name):
//!   token.cancel() (in-flight tasks keep running, their permits still release)
//! ```
//!
//! ## Rules
//! - Names are unique among live records; a removed name can be reused.
//! - The registry never awaits a task instance or a scheduler while serving
//!   commands; it only joins schedulers on exit, bounded by `Config::grace`.
//! - Reports from a scheduler run that was since paused or replaced are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::admission::Admission;
use crate::config::Config;
use crate::core::clock::ActiveClock;
use crate::core::command::{Command, Lifecycle, Outcome, SchedulerExit, Target};
use crate::core::scheduler::{GeneratorScheduler, SchedulerShared};
use crate::error::{RegistryError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::generator::{
    GeneratorInfo, GeneratorSpec, GeneratorStats, GeneratorStatus, LifecycleState,
};
use crate::load::RateModel;

/// Live scheduler of a running generator.
struct Run {
    id: u64,
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// Everything the registry keeps per generator.
struct Record {
    spec: GeneratorSpec,
    state: LifecycleState,
    admission: Arc<Admission>,
    stats: Arc<GeneratorStats>,
    clock: ActiveClock,
    run: Option<Run>,
    /// Number of times the scheduler was started.
    starts: u64,
}

impl Record {
    fn new(spec: GeneratorSpec) -> Self {
        Self {
            admission: Admission::new(spec.options().max_concurrent),
            stats: Arc::default(),
            state: LifecycleState::Uninitialized,
            clock: ActiveClock::default(),
            run: None,
            starts: 0,
            spec,
        }
    }

    /// Cancels the scheduler (if any) and banks active time.
    ///
    /// Returns the join handle so the caller may await it or let it detach.
    fn stop(&mut self) -> Option<JoinHandle<()>> {
        let run = self.run.take()?;
        run.token.cancel();
        self.clock.stop();
        self.state = LifecycleState::Paused;
        Some(run.join)
    }

    fn info(&self) -> GeneratorInfo {
        let opts = self.spec.options();
        GeneratorInfo {
            name: Arc::clone(self.spec.name_arc()),
            state: self.state,
            auto_init: opts.auto_init,
            duration: opts.duration,
            max_concurrent: self.admission.ceiling(),
            runner: opts.runner.name(),
        }
    }

    fn status(&self) -> GeneratorStatus {
        GeneratorStatus {
            name: Arc::clone(self.spec.name_arc()),
            state: self.state,
            in_flight: self.admission.in_flight(),
            max_concurrent: self.admission.ceiling(),
            elapsed: self.clock.elapsed(),
            stats: self.stats.snapshot(),
        }
    }
}

/// Command-driven owner of all generators.
pub(crate) struct Registry {
    generators: HashMap<Arc<str>, Record>,
    cfg: Config,
    bus: Bus,
    runtime_token: CancellationToken,
    report: mpsc::WeakSender<Command>,
    next_run_id: u64,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// `report` must belong to the queue later passed to [`Registry::run`].
    pub(crate) fn new(
        cfg: Config,
        bus: Bus,
        runtime_token: CancellationToken,
        report: mpsc::WeakSender<Command>,
    ) -> Self {
        Self {
            generators: HashMap::new(),
            cfg,
            bus,
            runtime_token,
            report,
            next_run_id: 0,
        }
    }

    /// Serves commands until the runtime token is cancelled or every
    /// [`LoadVisor`](crate::LoadVisor) handle is gone, then stops all schedulers.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command>) -> Result<(), RuntimeError> {
        let token = self.runtime_token.clone();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        // Pending and future callers see `Closed`.
        drop(rx);
        self.stop_all().await
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Add { spec, reply } => {
                let _ = reply.send(self.add(spec));
            }
            Command::AddBatch { specs, reply } => {
                let out = specs
                    .into_iter()
                    .map(|spec| {
                        let name = spec.name().to_string();
                        (name, self.add(spec))
                    })
                    .collect();
                let _ = reply.send(out);
            }
            Command::Lifecycle { op, target, reply } => {
                let _ = reply.send(self.apply(op, target));
            }
            Command::SetMaxConcurrent { name, n, reply } => {
                let _ = reply.send(self.set_max_concurrent(&name, n));
            }
            Command::GetMaxConcurrent { name, reply } => {
                let res = self
                    .generators
                    .get(name.as_str())
                    .map(|rec| rec.admission.ceiling())
                    .ok_or_else(|| RegistryError::non_existing(&name));
                let _ = reply.send(res);
            }
            Command::IsRunning { name, reply } => {
                let running = self
                    .generators
                    .get(name.as_str())
                    .is_some_and(|rec| rec.state == LifecycleState::Running);
                let _ = reply.send(running);
            }
            Command::List { reply } => {
                let _ = reply.send(self.sorted().map(Record::info).collect());
            }
            Command::Top { reply } => {
                let _ = reply.send(self.sorted().map(Record::status).collect());
            }
            Command::SchedulerExited { name, run_id, exit } => {
                self.on_scheduler_exit(&name, run_id, exit);
            }
        }
    }

    /// Records in name order.
    fn sorted(&self) -> impl Iterator<Item = &Record> {
        let mut records: Vec<&Record> = self.generators.values().collect();
        records.sort_unstable_by(|a, b| a.spec.name().cmp(b.spec.name()));
        records.into_iter()
    }

    fn add(&mut self, spec: GeneratorSpec) -> Result<(), RegistryError> {
        if self.generators.contains_key(spec.name()) {
            return Err(RegistryError::duplicated(spec.name()));
        }
        let name = Arc::clone(spec.name_arc());
        let auto_init = spec.options().auto_init;

        self.generators.insert(Arc::clone(&name), Record::new(spec));
        self.bus
            .publish(Event::new(EventKind::GeneratorAdded).with_generator(Arc::clone(&name)));

        if auto_init {
            self.init(&name)?;
        }
        Ok(())
    }

    fn apply(&mut self, op: Lifecycle, target: Target) -> Vec<Outcome> {
        let names = match target {
            Target::All => {
                let mut names: Vec<String> =
                    self.generators.keys().map(|n| n.to_string()).collect();
                names.sort_unstable();
                names
            }
            Target::One(name) => vec![name],
            Target::Many(names) => names,
        };

        names
            .into_iter()
            .map(|name| {
                let res = match op {
                    Lifecycle::Init => self.init(&name),
                    Lifecycle::Pause => self.pause(&name),
                    Lifecycle::Remove => self.remove(&name),
                };
                (name, res)
            })
            .collect()
    }

    fn init(&mut self, name: &str) -> Result<(), RegistryError> {
        let Some(rec) = self.generators.get_mut(name) else {
            return Err(RegistryError::non_existing(name));
        };
        if rec.state == LifecycleState::Running {
            return Err(RegistryError::already_started(name));
        }

        let opts = rec.spec.options();
        // A completed run starts its curve over.
        if opts.duration.is_some_and(|limit| rec.clock.elapsed() >= limit) {
            rec.clock.reset();
        }
        let idle_poll = self.cfg.idle_poll_clamped();
        let horizon = self.cfg.horizon_clamped();
        let rate = match opts.seed {
            Some(seed) => RateModel::seeded(seed.wrapping_add(rec.starts), idle_poll, horizon),
            None => RateModel::new(idle_poll, horizon),
        };

        rec.clock.start();
        self.next_run_id += 1;
        let run_id = self.next_run_id;
        let token = self.runtime_token.child_token();

        let scheduler = GeneratorScheduler::new(
            &rec.spec,
            SchedulerShared {
                admission: Arc::clone(&rec.admission),
                stats: Arc::clone(&rec.stats),
                bus: self.bus.clone(),
            },
            rate,
            rec.clock,
        );
        let join = scheduler.spawn(token.clone(), run_id, self.report.clone());

        rec.run = Some(Run {
            id: run_id,
            token,
            join,
        });
        rec.state = LifecycleState::Running;
        rec.starts += 1;

        self.bus.publish(
            Event::new(EventKind::GeneratorStarted)
                .with_generator(Arc::clone(rec.spec.name_arc()))
                .with_elapsed(rec.clock.elapsed()),
        );
        Ok(())
    }

    fn pause(&mut self, name: &str) -> Result<(), RegistryError> {
        let Some(rec) = self.generators.get_mut(name) else {
            return Err(RegistryError::non_existing(name));
        };
        // Paused / never started: nothing to stop.
        if rec.stop().is_some() {
            self.bus.publish(
                Event::new(EventKind::GeneratorPaused)
                    .with_generator(Arc::clone(rec.spec.name_arc()))
                    .with_elapsed(rec.clock.elapsed())
                    .with_in_flight(rec.admission.in_flight()),
            );
        }
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), RegistryError> {
        let Some(mut rec) = self.generators.remove(name) else {
            return Err(RegistryError::non_existing(name));
        };
        rec.stop();
        rec.state = LifecycleState::Removed;
        self.bus.publish(
            Event::new(EventKind::GeneratorRemoved)
                .with_generator(Arc::clone(rec.spec.name_arc()))
                .with_in_flight(rec.admission.in_flight()),
        );
        Ok(())
    }

    fn set_max_concurrent(&mut self, name: &str, n: usize) -> Result<(), RegistryError> {
        let rec = self
            .generators
            .get(name)
            .ok_or_else(|| RegistryError::non_existing(name))?;
        rec.admission.set_ceiling(n);
        tracing::debug!(generator = name, max_concurrent = n, "concurrency ceiling updated");
        Ok(())
    }

    fn on_scheduler_exit(&mut self, name: &str, run_id: u64, exit: SchedulerExit) {
        let Some(rec) = self.generators.get_mut(name) else {
            return;
        };
        let current = rec.run.as_ref().is_some_and(|run| run.id == run_id);
        if !current || matches!(exit, SchedulerExit::Stopped) {
            return;
        }
        rec.stop();

        let ev = match exit {
            SchedulerExit::Stopped => return,
            SchedulerExit::Completed { elapsed } => {
                if let Some(limit) = rec.spec.options().duration {
                    rec.clock.clamp(limit);
                }
                Event::new(EventKind::GeneratorCompleted).with_elapsed(elapsed)
            }
            SchedulerExit::Crashed { info } => {
                tracing::error!(generator = name, %info, "scheduler panicked");
                Event::new(EventKind::GeneratorPaused)
                    .with_elapsed(rec.clock.elapsed())
                    .with_reason(format!("scheduler panicked: {info}"))
            }
        };
        self.bus
            .publish(ev.with_generator(Arc::clone(rec.spec.name_arc())));
    }

    /// Stops every scheduler and waits for them up to `Config::grace`.
    async fn stop_all(&mut self) -> Result<(), RuntimeError> {
        let mut joins: Vec<(Arc<str>, JoinHandle<()>)> = self
            .generators
            .iter_mut()
            .filter_map(|(name, rec)| rec.stop().map(|join| (Arc::clone(name), join)))
            .collect();

        let grace = self.cfg.grace;
        let done = async {
            for (_, join) in joins.iter_mut() {
                let _ = join.await;
            }
        };
        if time::timeout(grace, done).await.is_ok() {
            return Ok(());
        }

        let mut stuck: Vec<String> = joins
            .iter()
            .filter(|(_, join)| !join.is_finished())
            .map(|(name, _)| name.to_string())
            .collect();
        stuck.sort_unstable();
        tracing::warn!(?grace, ?stuck, "schedulers still running after grace period");
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}
