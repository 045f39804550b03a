use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters of one generator.
///
/// Updated by its scheduler and by task completions; read by `top`.
#[derive(Debug, Default)]
pub struct GeneratorStats {
    dispatched: AtomicU64,
    skipped: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    invalid_rate: AtomicU64,
}

/// Point-in-time copy of [`GeneratorStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Task instances handed to the runner.
    pub dispatched: u64,
    /// Ticks dropped by admission control.
    pub skipped: u64,
    /// Task instances that finished successfully (or cancelled themselves).
    pub completed: u64,
    /// Task instances that failed, timed out or panicked.
    pub failed: u64,
    /// Ticks skipped because the load spec returned an invalid intensity.
    pub invalid_rate: u64,
}

impl GeneratorStats {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_rate(&self) {
        self.invalid_rate.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            invalid_rate: self.invalid_rate.load(Ordering::Relaxed),
        }
    }
}
