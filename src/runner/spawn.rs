//! # Fire-and-forget runner (default).
//!
//! [`SpawnRunner`] executes every admitted instance as its own tokio task and
//! returns to the scheduler immediately.
//!
//! ## Timeout
//! The runner's own timeout applies unless the generator's `runner_args`
//! carry a [`Duration`], which overrides it per generator.

use std::time::Duration;

use async_trait::async_trait;

use crate::runner::strategy::{Completion, RunnerArgs, TaskRunner, execute};
use crate::tasks::TaskRef;

/// Spawns each task instance; never blocks the scheduler loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpawnRunner {
    timeout: Option<Duration>,
}

impl SpawnRunner {
    /// Creates a runner without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner that fails instances running longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl TaskRunner for SpawnRunner {
    fn name(&self) -> &'static str {
        "spawn"
    }

    async fn dispatch(&self, task: TaskRef, args: Option<RunnerArgs>, done: Completion) {
        let timeout = args
            .as_ref()
            .and_then(|a| a.downcast_ref::<Duration>().copied())
            .or(self.timeout);

        tokio::spawn(async move {
            let res = execute(task.as_ref(), timeout).await;
            done.finish(res);
        });
    }
}
