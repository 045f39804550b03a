//! Lifecycle states and the snapshots returned by `list` / `top`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::stats::StatsSnapshot;

/// Lifecycle of one generator.
///
/// ```text
/// Uninitialized ──init──► Running ──pause / duration elapsed──► Paused
///                            ▲                                     │
///                            └────────────────init─────────────────┘
/// any ──remove──► Removed (terminal, name reusable)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Added, never started.
    Uninitialized,
    /// Scheduler loop active.
    Running,
    /// Scheduler loop stopped; in-flight tasks may still be finishing.
    Paused,
    /// Discarded from the registry.
    Removed,
}

impl LifecycleState {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Running => "running",
            LifecycleState::Paused => "paused",
            LifecycleState::Removed => "removed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One row of `list`: identity, configuration and state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorInfo {
    /// Generator name.
    pub name: Arc<str>,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Whether the generator started on `add`.
    pub auto_init: bool,
    /// Configured run length (`None` = infinite).
    pub duration: Option<Duration>,
    /// Current concurrency ceiling (`0` = unlimited).
    pub max_concurrent: usize,
    /// Name of the task runner strategy.
    pub runner: &'static str,
}

/// One row of `top`: live counters for human-facing reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorStatus {
    /// Generator name.
    pub name: Arc<str>,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Task instances currently in flight.
    pub in_flight: usize,
    /// Current concurrency ceiling (`0` = unlimited).
    pub max_concurrent: usize,
    /// Active time the load spec is evaluated at (pauses excluded).
    pub elapsed: Duration,
    /// Lifetime counters.
    pub stats: StatsSnapshot,
}
