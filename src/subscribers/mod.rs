//! # Event subscribers for the loadvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and a built-in `tracing` writer.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler ── publish(Event) ──► Bus ──► LoadVisor listener ──► SubscriberSet
//!                                                                     │
//!                                                    ┌────────────────┼──────────┐
//!                                                    ▼                ▼          ▼
//!                                                LogWriter         Metrics    Custom
//! ```

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
