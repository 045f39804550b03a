//! # Task abstraction.
//!
//! A [`Task`] is the opaque unit of work a generator dispatches. Its business
//! logic, internal timeouts and error reporting belong to the caller; loadvisor
//! only observes that it eventually completes with success or failure.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous unit of work.
///
/// One call to [`run`](Task::run) is one task instance. Instances of the same
/// task may run concurrently, bounded only by the generator's `max_concurrent`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use loadvisor::{Task, TaskError};
///
/// struct Ping;
///
/// #[async_trait]
/// impl Task for Ping {
///     async fn run(&self) -> Result<(), TaskError> {
///         // hit the target...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Executes one task instance.
    async fn run(&self) -> Result<(), TaskError>;
}
