//! # Task runners.
//!
//! - [`TaskRunner`] pluggable dispatch strategy (`dispatch(task, args, completion)`)
//! - [`Completion`] settles one instance: records the outcome, releases admission
//! - [`SpawnRunner`] default fire-and-forget strategy
//! - [`InlineRunner`] awaits each instance on the scheduler's own task
//! - [`execute`] shared helper: timeout + panic isolation
//!
//! ## Flow
//! ```text
//! GeneratorScheduler ──► admission.try_acquire() ──► Permit
//!                                                     │
//!                       Completion { permit, stats, bus }
//!                                                     ▼
//!                        runner.dispatch(task, args, completion)
//!                                                     │
//!                          execute(task, timeout) ──► completion.finish(res)
//!                                                     └─► permit dropped → slot released
//! ```

mod inline;
mod spawn;
mod strategy;

pub use inline::InlineRunner;
pub use spawn::SpawnRunner;
pub use strategy::{Completion, RunnerArgs, RunnerRef, TaskRunner, execute};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;
    use crate::admission::Admission;
    use crate::error::TaskError;
    use crate::events::{Bus, EventKind};
    use crate::generator::GeneratorStats;
    use crate::tasks::{TaskFn, TaskRef};

    fn completion(adm: &Arc<Admission>, stats: &Arc<GeneratorStats>, bus: &Bus) -> Completion {
        let permit = adm.try_acquire().expect("admission");
        Completion::new(Arc::from("g"), Arc::clone(stats), bus.clone(), permit)
    }

    #[tokio::test]
    async fn execute_converts_panics() {
        let task: TaskRef = TaskFn::arc(|| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        });
        let res = execute(task.as_ref(), None).await;
        assert_eq!(
            res,
            Err(TaskError::Panicked {
                info: "kaboom".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn execute_applies_timeout() {
        let task: TaskRef = TaskFn::arc(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        });
        let res = execute(task.as_ref(), Some(Duration::from_secs(1))).await;
        assert_eq!(
            res,
            Err(TaskError::Timeout {
                timeout: Duration::from_secs(1)
            })
        );
        assert!(execute(task.as_ref(), Some(Duration::ZERO)).await.is_ok());
    }

    #[tokio::test]
    async fn finish_records_and_releases() {
        let adm = Admission::new(0);
        let stats = Arc::new(GeneratorStats::default());
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        completion(&adm, &stats, &bus).finish(Ok(()));
        completion(&adm, &stats, &bus).finish(Err(TaskError::Canceled));
        completion(&adm, &stats, &bus).finish(Err(TaskError::fail("503")));
        drop(completion(&adm, &stats, &bus));

        assert_eq!(adm.in_flight(), 0);
        let snap = stats.snapshot();
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 1);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskFailed);
        assert_eq!(ev.generator.as_deref(), Some("g"));
        assert_eq!(ev.reason.as_deref(), Some("execution failed: 503"));
    }

    #[tokio::test]
    async fn timeouts_publish_timeout_then_failure() {
        let adm = Admission::new(0);
        let stats = Arc::new(GeneratorStats::default());
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        completion(&adm, &stats, &bus).finish(Err(TaskError::Timeout {
            timeout: Duration::from_millis(250),
        }));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::TimeoutHit);
        assert_eq!(first.timeout_ms, Some(250));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::TaskFailed);
    }

    #[tokio::test]
    async fn spawn_runner_returns_before_task_finishes() {
        let adm = Admission::new(0);
        let stats = Arc::new(GeneratorStats::default());
        let bus = Bus::new(16);
        let gate = Arc::new(Notify::new());

        let g = gate.clone();
        let task: TaskRef = TaskFn::arc(move || {
            let g = g.clone();
            async move {
                g.notified().await;
                Ok(())
            }
        });

        SpawnRunner::new()
            .dispatch(task, None, completion(&adm, &stats, &bus))
            .await;
        assert_eq!(adm.in_flight(), 1);

        gate.notify_one();
        while adm.in_flight() != 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(stats.snapshot().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runner_args_override_timeout() {
        let adm = Admission::new(0);
        let stats = Arc::new(GeneratorStats::default());
        let bus = Bus::new(16);
        let task: TaskRef = TaskFn::arc(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });

        InlineRunner::with_timeout(Duration::from_secs(60))
            .dispatch(
                task,
                Some(RunnerArgs::new(Duration::from_secs(1))),
                completion(&adm, &stats, &bus),
            )
            .await;

        assert_eq!(adm.in_flight(), 0);
        assert_eq!(stats.snapshot().failed, 1);
    }
}
