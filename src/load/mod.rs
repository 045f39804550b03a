//! Load shaping: what intensity to offer, and when to dispatch.
//!
//! ## Contents
//! - [`LoadSpec`] intensity (calls/sec) as a function of active elapsed time
//! - [`LoadShape`] built-in curves (constant, ramp, steps, sine, spike)
//! - [`RateModel`] samples inter-arrival waits from the current intensity
//!
//! ## Quick wiring
//! ```text
//! GeneratorSpec { load: LoadSpecRef, .. }
//!      └─► core::scheduler::GeneratorScheduler uses:
//!           - rate.next_tick(load, elapsed) to pick the next Tick
//!           - Tick::Fire → admission → runner; Tick::Recheck → loop
//! ```

mod rate;
mod spec;

pub use rate::{RateModel, Tick};
pub use spec::{LoadShape, LoadSpec, LoadSpecRef};
