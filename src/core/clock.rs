//! Active-time accounting for one generator.
//!
//! The load spec is evaluated at *active* elapsed time: time spent paused is
//! not counted, so a paused curve resumes where it stopped.

use std::time::Duration;

use tokio::time::Instant;

/// Banked active time plus the start of the current run, if any.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ActiveClock {
    banked: Duration,
    since: Option<Instant>,
}

impl ActiveClock {
    /// Active time accumulated so far, including the current run.
    pub(crate) fn elapsed(&self) -> Duration {
        self.banked + self.since.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Starts counting (no-op when already running).
    pub(crate) fn start(&mut self) {
        if self.since.is_none() {
            self.since = Some(Instant::now());
        }
    }

    /// Stops counting and banks the current run.
    pub(crate) fn stop(&mut self) {
        if let Some(since) = self.since.take() {
            self.banked += since.elapsed();
        }
    }

    /// Caps banked time at `max`.
    pub(crate) fn clamp(&mut self, max: Duration) {
        self.banked = self.banked.min(max);
    }

    /// Forgets all accumulated time.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
