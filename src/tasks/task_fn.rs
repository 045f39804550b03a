//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future per
//! dispatch. Shared state goes into the closure explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use loadvisor::{TaskFn, TaskRef, TaskError};
//!
//! let hits = Arc::new(AtomicU64::new(0));
//! let counter = hits.clone();
//! let t: TaskRef = TaskFn::arc(move || {
//!     let counter = counter.clone();
//!     async move {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!         Ok::<_, TaskError>(())
//!     }
//! });
//! # let _ = t;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Function-backed task implementation.
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self) -> Result<(), TaskError> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskRef;

    #[tokio::test]
    async fn each_run_creates_a_fresh_future() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = calls.clone();
        let task: TaskRef = TaskFn::arc(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(TaskError::fail("nope"))
            }
        });

        assert_eq!(task.run().await, Err(TaskError::fail("nope")));
        assert!(task.run().await.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
