//! Error types used by the loadvisor registry, rate model, and tasks.
//!
//! This module defines four error enums:
//!
//! - [`RuntimeError`]: shutdown-level failures of a [`LoadVisor`](crate::LoadVisor).
//! - [`RegistryError`]: outcome of a control command against one generator name.
//! - [`RateError`]: a load spec produced an intensity that cannot be scheduled.
//! - [`TaskError`]: failure of one dispatched task instance.
//!
//! All of them provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the loadvisor runtime.
///
/// Returned by [`LoadVisor::shutdown`](crate::LoadVisor::shutdown) and
/// [`LoadVisor::shutdown_on_signal`](crate::LoadVisor::shutdown_on_signal).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Some schedulers did not stop within the configured grace period.
    #[error("grace period {grace:?} exceeded; stuck generators: {stuck:?}")]
    GraceExceeded {
        /// The grace duration that was exceeded.
        grace: Duration,
        /// Names of generators whose scheduler was still running.
        stuck: Vec<String>,
    },

    /// OS signal handlers could not be installed.
    #[error("signal handler registration failed: {reason}")]
    Signal {
        /// The underlying I/O error message.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal { .. } => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck: {stuck:?}")
            }
            RuntimeError::Signal { reason } => format!("signal: {reason}"),
        }
    }
}

/// # Errors returned by registry commands.
///
/// Every command reports one of these per targeted name; batch commands never
/// abort because one element failed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A generator with this name already exists; the original is preserved.
    #[error("generator {name:?} already exists")]
    Duplicated {
        /// The conflicting name.
        name: String,
    },

    /// No live generator carries this name (never added, or already removed).
    #[error("generator {name:?} does not exist")]
    NonExisting {
        /// The requested name.
        name: String,
    },

    /// `init` was called on a generator that is already running.
    #[error("generator {name:?} is already started")]
    AlreadyStarted {
        /// The requested name.
        name: String,
    },

    /// The registry actor is gone (after [`LoadVisor::shutdown`](crate::LoadVisor::shutdown)).
    #[error("registry is closed")]
    Closed,
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use loadvisor::RegistryError;
    ///
    /// let err = RegistryError::Duplicated { name: "g1".into() };
    /// assert_eq!(err.as_label(), "duplicated");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::Duplicated { .. } => "duplicated",
            RegistryError::NonExisting { .. } => "non_existing",
            RegistryError::AlreadyStarted { .. } => "already_started",
            RegistryError::Closed => "registry_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistryError::Duplicated { name } => format!("duplicated: {name}"),
            RegistryError::NonExisting { name } => format!("non_existing: {name}"),
            RegistryError::AlreadyStarted { name } => format!("already_started: {name}"),
            RegistryError::Closed => "registry closed".to_string(),
        }
    }

    pub(crate) fn duplicated(name: &str) -> Self {
        RegistryError::Duplicated { name: name.to_string() }
    }

    pub(crate) fn non_existing(name: &str) -> Self {
        RegistryError::NonExisting { name: name.to_string() }
    }

    pub(crate) fn already_started(name: &str) -> Self {
        RegistryError::AlreadyStarted { name: name.to_string() }
    }
}

/// # Errors produced while evaluating a load spec.
///
/// Fatal to the current scheduling tick only: the tick is skipped and the
/// condition is published as [`EventKind::InvalidRate`](crate::EventKind::InvalidRate).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// The load spec returned a negative or non-finite intensity.
    #[error("invalid intensity {value} at {elapsed:?}")]
    InvalidRate {
        /// The offending intensity (calls/sec).
        value: f64,
        /// Active elapsed time the load spec was evaluated at.
        elapsed: Duration,
    },
}

impl RateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RateError::InvalidRate { .. } => "invalid_rate",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RateError::InvalidRate { value, elapsed } => {
                format!("intensity={value} elapsed={elapsed:?}")
            }
        }
    }
}

/// # Errors produced by task execution.
///
/// These never reach the scheduler or the registry; runners record them and
/// publish [`EventKind::TaskFailed`](crate::EventKind::TaskFailed).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution exceeded the runner's timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task panicked; the panic was caught by the runner.
    #[error("task panicked: {info}")]
    Panicked {
        /// Best-effort panic payload.
        info: String,
    },

    /// Task gave up on its own accord (treated as a graceful exit).
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use loadvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }

    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail { error: error.into() }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
