//! # Inline runner.
//!
//! [`InlineRunner`] awaits each instance inside `dispatch`, so the owning
//! scheduler does not sample its next arrival until the task finishes. Use it
//! for closed-loop generators (one outstanding call at a time per generator)
//! or for targets that must never see overlapping calls.

use std::time::Duration;

use async_trait::async_trait;

use crate::runner::strategy::{Completion, RunnerArgs, TaskRunner, execute};
use crate::tasks::TaskRef;

/// Runs each task instance on the scheduler's own task.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineRunner {
    timeout: Option<Duration>,
}

impl InlineRunner {
    /// Creates a runner that fails instances running longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl TaskRunner for InlineRunner {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn dispatch(&self, task: TaskRef, args: Option<RunnerArgs>, done: Completion) {
        let timeout = args
            .as_ref()
            .and_then(|a| a.downcast_ref::<Duration>().copied())
            .or(self.timeout);

        let res = execute(task.as_ref(), timeout).await;
        done.finish(res);
    }
}
