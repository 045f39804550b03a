//! # Generator model.
//!
//! - [`GeneratorSpec`] / [`GeneratorOptions`] - immutable configuration supplied on `add`
//! - [`LifecycleState`] - uninitialized / running / paused / removed
//! - [`GeneratorInfo`], [`GeneratorStatus`] - snapshots returned by `list` / `top`
//! - [`GeneratorStats`] - lifetime counters shared by scheduler and completions

mod spec;
mod state;
mod stats;

pub use spec::{GeneratorOptions, GeneratorSpec, GeneratorSpecBuilder};
pub use state::{GeneratorInfo, GeneratorStatus, LifecycleState};
pub use stats::{GeneratorStats, StatsSnapshot};
