//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the registry actor,
//! generator schedulers, task completions and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Registry`, `GeneratorScheduler`, `Completion`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `LoadVisor`'s subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver obtained via `LoadVisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
