//! # Runtime events emitted by the registry, schedulers and runners.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: generator added/started/paused/completed/removed
//! - **Dispatch events**: admission skips, task failures, invalid intensities
//! - **Runtime events**: subscriber overflow/panic, shutdown
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use loadvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_generator("checkout")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.generator.as_deref(), Some("checkout"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Generator lifecycle ===
    /// Generator registered under a fresh name.
    GeneratorAdded,

    /// Scheduler loop started (`init` or auto-init).
    ///
    /// Sets `elapsed_ms`: active time the curve resumes from.
    GeneratorStarted,

    /// Scheduler loop stopped by `pause`.
    GeneratorPaused,

    /// Scheduler loop stopped because the configured duration elapsed.
    GeneratorCompleted,

    /// Generator record discarded; in-flight tasks keep running.
    GeneratorRemoved,

    // === Dispatch ===
    /// A generator started dropping dispatch ticks at its concurrency ceiling.
    ///
    /// Published once per streak of skips; every skip is still counted in
    /// the generator's stats. Sets `in_flight`.
    TaskSkipped,

    /// A task instance failed or panicked.
    ///
    /// Sets `reason`.
    TaskFailed,

    /// A task instance exceeded the runner timeout (always followed by `TaskFailed`).
    ///
    /// Sets `timeout_ms`.
    TimeoutHit,

    /// The load spec produced a negative or non-finite intensity; the tick was skipped.
    ///
    /// Sets `reason`, `elapsed_ms`.
    InvalidRate,

    // === Runtime ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    /// `LoadVisor::shutdown` was called.
    ShutdownRequested,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the generator, if applicable (subscriber name for subscriber events).
    pub generator: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Active elapsed time of the generator in milliseconds.
    pub elapsed_ms: Option<u64>,
    /// Runner timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// In-flight task count when the event was produced.
    pub in_flight: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            generator: None,
            reason: None,
            elapsed_ms: None,
            timeout_ms: None,
            in_flight: None,
        }
    }

    /// Attaches a generator name.
    #[inline]
    pub fn with_generator(mut self, name: impl Into<Arc<str>>) -> Self {
        self.generator = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the generator's active elapsed time.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches the in-flight count.
    #[inline]
    pub fn with_in_flight(mut self, n: usize) -> Self {
        self.in_flight = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_generator(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_generator(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
