//! # Control commands accepted by the registry actor.
//!
//! Every public [`LoadVisor`](crate::LoadVisor) operation becomes one
//! [`Command`] carrying a `oneshot` reply channel. The actor processes commands
//! strictly in arrival order, so concurrent callers observe a serial history.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::RegistryError;
use crate::generator::{GeneratorInfo, GeneratorSpec, GeneratorStatus};

/// Per-name outcome of a command addressed to several generators.
pub type Outcome = (String, Result<(), RegistryError>);

type Reply<T> = oneshot::Sender<T>;

/// Which generators a lifecycle command applies to.
///
/// ```rust
/// use loadvisor::Target;
///
/// assert_eq!(Target::from("g1"), Target::One("g1".into()));
/// assert_eq!(Target::from(["a", "b"]), Target::Many(vec!["a".into(), "b".into()]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Every generator currently registered (results sorted by name).
    All,
    /// A single generator.
    One(String),
    /// An explicit list; results follow the list order, duplicates included.
    Many(Vec<String>),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::One(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::One(name)
    }
}

impl From<Vec<String>> for Target {
    fn from(names: Vec<String>) -> Self {
        Target::Many(names)
    }
}

impl From<Vec<&str>> for Target {
    fn from(names: Vec<&str>) -> Self {
        Target::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(names: [&str; N]) -> Self {
        Target::Many(names.into_iter().map(str::to_string).collect())
    }
}

/// Lifecycle operation applied per name by `init` / `pause` / `remove`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Init,
    Pause,
    Remove,
}

/// How a scheduler loop ended on its own.
#[derive(Debug)]
pub(crate) enum SchedulerExit {
    /// Cancelled by pause, remove or shutdown.
    Stopped,
    /// The configured duration of active time elapsed.
    Completed { elapsed: Duration },
    /// The load spec or runner panicked inside the loop.
    Crashed { info: String },
}

/// Message processed by the registry actor.
pub(crate) enum Command {
    Add {
        spec: GeneratorSpec,
        reply: Reply<Result<(), RegistryError>>,
    },
    AddBatch {
        specs: Vec<GeneratorSpec>,
        reply: Reply<Vec<Outcome>>,
    },
    Lifecycle {
        op: Lifecycle,
        target: Target,
        reply: Reply<Vec<Outcome>>,
    },
    SetMaxConcurrent {
        name: String,
        n: usize,
        reply: Reply<Result<(), RegistryError>>,
    },
    GetMaxConcurrent {
        name: String,
        reply: Reply<Result<usize, RegistryError>>,
    },
    IsRunning {
        name: String,
        reply: Reply<bool>,
    },
    List {
        reply: Reply<Vec<GeneratorInfo>>,
    },
    Top {
        reply: Reply<Vec<GeneratorStatus>>,
    },
    /// Sent by a scheduler that stopped without being cancelled.
    SchedulerExited {
        name: Arc<str>,
        run_id: u64,
        exit: SchedulerExit,
    },
}
