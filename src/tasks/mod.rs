//! # Task abstractions.
//!
//! - [`Task`] - trait for one asynchronous unit of work
//! - [`TaskFn`] - closure-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
