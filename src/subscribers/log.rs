//! # LogWriter: events to `tracing`
//!
//! A minimal subscriber that forwards incoming [`Event`]s to the `tracing`
//! facade. Install any `tracing` subscriber (e.g. `tracing-subscriber`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  loadvisor: generator started generator="checkout" elapsed_ms=0
//! DEBUG loadvisor: task skipped generator="checkout" in_flight=5
//! WARN  loadvisor: task failed generator="checkout" reason="execution failed: 503"
//! INFO  loadvisor: generator paused generator="checkout"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let generator = e.generator.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::GeneratorAdded => {
                tracing::info!(target: "loadvisor", generator, "generator added");
            }
            EventKind::GeneratorStarted => {
                tracing::info!(target: "loadvisor", generator, elapsed_ms = e.elapsed_ms, "generator started");
            }
            EventKind::GeneratorPaused => {
                tracing::info!(target: "loadvisor", generator, elapsed_ms = e.elapsed_ms, "generator paused");
            }
            EventKind::GeneratorCompleted => {
                tracing::info!(target: "loadvisor", generator, elapsed_ms = e.elapsed_ms, "generator completed");
            }
            EventKind::GeneratorRemoved => {
                tracing::info!(target: "loadvisor", generator, "generator removed");
            }
            EventKind::TaskSkipped => {
                tracing::debug!(target: "loadvisor", generator, in_flight = e.in_flight, "task skipped");
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: "loadvisor", generator, reason, "task failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "loadvisor", generator, timeout_ms = e.timeout_ms, "task timed out");
            }
            EventKind::InvalidRate => {
                tracing::error!(target: "loadvisor", generator, reason, "invalid intensity");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "loadvisor", subscriber = generator, reason, "subscriber panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "loadvisor", subscriber = generator, reason, "subscriber overflow");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "loadvisor", "shutdown requested");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
