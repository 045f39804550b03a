//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for a [`LoadVisor`](crate::LoadVisor).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` / `command_capacity = 0` → clamped to 1
//! - `idle_poll = 0s` / `horizon = 0s` → clamped to 1ms (a zero sleep would spin)

use std::time::Duration;

/// Global configuration for the load generator runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `command_capacity`: Registry command queue size (min 1)
/// - `idle_poll`: How often a generator re-reads a zero intensity
/// - `horizon`: Longest a scheduler sleeps before re-reading its load spec
/// - `grace`: How long `shutdown` waits for schedulers to stop
///
/// ## Notes
/// All fields are public for flexibility. Prefer the clamped accessors over
/// reading the fields directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Capacity of the registry command queue.
    ///
    /// Commands wait (asynchronously) while the queue is full.
    pub command_capacity: usize,

    /// Poll interval used while a load spec reports zero intensity.
    ///
    /// The scheduler stays alive and re-evaluates the load spec at this cadence so a
    /// curve that starts at zero can later become positive.
    pub idle_poll: Duration,

    /// Re-evaluation horizon for the rate model.
    ///
    /// A sampled inter-arrival longer than this is cut short and re-sampled
    /// against the current intensity. Smaller values track fast-changing
    /// curves more closely at the cost of more wakeups.
    pub horizon: Duration,

    /// Maximum time `shutdown` waits for scheduler loops to exit.
    ///
    /// Only a scheduler blocked inside a runner's `dispatch` can take longer
    /// than a tick to stop.
    pub grace: Duration,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a command queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Returns the idle poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn idle_poll_clamped(&self) -> Duration {
        self.idle_poll.max(Duration::from_millis(1))
    }

    /// Returns the rate horizon clamped to a minimum of 1ms.
    #[inline]
    pub fn horizon_clamped(&self) -> Duration {
        self.horizon.max(Duration::from_millis(1))
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `command_capacity = 256`
    /// - `idle_poll = 100ms`
    /// - `horizon = 250ms`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            command_capacity: 256,
            idle_poll: Duration::from_millis(100),
            horizon: Duration::from_millis(250),
            grace: Duration::from_secs(5),
        }
    }
}
