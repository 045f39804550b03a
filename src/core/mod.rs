//! Runtime core: registry actor, schedulers and the control handle.
//!
//! The only public API from this module is [`LoadVisor`] (with its builder),
//! plus the [`Target`] / [`Outcome`] types its commands use.
//!
//! Internal modules:
//! - [`registry`]: single-owner actor applying control commands;
//! - [`scheduler`]: dispatch loop of one running generator;
//! - [`clock`]: active-time accounting across pauses;
//! - [`command`]: command and reply types;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`visor`] / [`builder`]: the public handle and how it is wired.

mod builder;
mod clock;
mod command;
mod registry;
mod scheduler;
mod shutdown;
mod visor;

#[cfg(test)]
mod tests;

pub use builder::LoadVisorBuilder;
pub use command::{Outcome, Target};
pub use visor::LoadVisor;
