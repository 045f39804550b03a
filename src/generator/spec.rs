//! # Generator specification.
//!
//! Defines [`GeneratorSpec`], the immutable configuration bundle a caller
//! hands to [`LoadVisor::add`](crate::LoadVisor::add): a unique name, the task
//! to dispatch, the load spec shaping its rate, and [`GeneratorOptions`].
//!
//! A spec can be created:
//! - **Explicitly** with [`GeneratorSpec::new`] (full control)
//! - **Fluently** with [`GeneratorSpec::builder`]
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use loadvisor::{GeneratorSpec, LoadShape, TaskError};
//!
//! let spec = GeneratorSpec::builder("checkout", LoadShape::Constant(10.0))
//!     .max_concurrent(5)
//!     .duration(Duration::from_secs(60))
//!     .auto_init(true)
//!     .build(|| async { Ok::<(), TaskError>(()) });
//!
//! assert_eq!(spec.name(), "checkout");
//! assert_eq!(spec.options().max_concurrent, 5);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TaskError;
use crate::load::{LoadSpec, LoadSpecRef};
use crate::runner::{RunnerArgs, RunnerRef, SpawnRunner, TaskRunner};
use crate::tasks::{TaskFn, TaskRef};

/// Optional settings of a generator.
///
/// ## Field semantics
/// - `auto_init`: start the scheduler immediately on `add`
/// - `duration`: active run length after which the scheduler self-stops (`None` = infinite)
/// - `runner`: dispatch strategy (default [`SpawnRunner`])
/// - `runner_args`: opaque value handed to the runner with every dispatch
/// - `max_concurrent`: admission ceiling (`0` = unlimited)
/// - `seed`: fixed RNG seed for reproducible dispatch sequences (`None` = OS entropy)
#[derive(Clone)]
pub struct GeneratorOptions {
    /// Start the scheduler immediately on `add`.
    pub auto_init: bool,
    /// Active run length (`None` = run until paused or removed).
    pub duration: Option<Duration>,
    /// Task runner strategy.
    pub runner: RunnerRef,
    /// Opaque value passed to the runner.
    pub runner_args: Option<RunnerArgs>,
    /// Initial concurrency ceiling (`0` = unlimited).
    pub max_concurrent: usize,
    /// RNG seed for the rate model.
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    /// Defaults: manual init, infinite duration, [`SpawnRunner`], no args,
    /// unlimited concurrency, OS-seeded.
    fn default() -> Self {
        Self {
            auto_init: false,
            duration: None,
            runner: Arc::new(SpawnRunner::default()),
            runner_args: None,
            max_concurrent: 0,
            seed: None,
        }
    }
}

impl fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("auto_init", &self.auto_init)
            .field("duration", &self.duration)
            .field("runner", &self.runner.name())
            .field("runner_args", &self.runner_args)
            .field("max_concurrent", &self.max_concurrent)
            .field("seed", &self.seed)
            .finish()
    }
}

/// Immutable description of one load generator.
#[derive(Clone)]
pub struct GeneratorSpec {
    name: Arc<str>,
    task: TaskRef,
    load: LoadSpecRef,
    options: GeneratorOptions,
}

impl GeneratorSpec {
    /// Creates a new specification with explicit parameters.
    pub fn new(
        name: impl Into<Arc<str>>,
        task: TaskRef,
        load: LoadSpecRef,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            name: name.into(),
            task,
            load,
            options,
        }
    }

    /// Creates a builder for constructing a spec with a fluent API.
    pub fn builder(name: impl Into<Arc<str>>, load: impl LoadSpec) -> GeneratorSpecBuilder {
        GeneratorSpecBuilder::new(name, load)
    }

    /// Returns the generator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Returns the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Returns the load spec.
    pub fn load(&self) -> &LoadSpecRef {
        &self.load
    }

    /// Returns the options.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }
}

impl fmt::Debug for GeneratorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorSpec")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`GeneratorSpec`].
#[derive(Clone)]
pub struct GeneratorSpecBuilder {
    name: Arc<str>,
    load: LoadSpecRef,
    options: GeneratorOptions,
}

impl GeneratorSpecBuilder {
    /// Creates a new builder with the given name and load spec.
    pub fn new(name: impl Into<Arc<str>>, load: impl LoadSpec) -> Self {
        Self {
            name: name.into(),
            load: Arc::new(load),
            options: GeneratorOptions::default(),
        }
    }

    pub fn auto_init(mut self, auto_init: bool) -> Self {
        self.options.auto_init = auto_init;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.options.duration = Some(duration);
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.options.max_concurrent = n;
        self
    }

    pub fn runner(mut self, runner: impl TaskRunner) -> Self {
        self.options.runner = Arc::new(runner);
        self
    }

    pub fn runner_args(mut self, args: RunnerArgs) -> Self {
        self.options.runner_args = Some(args);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the spec from a closure.
    pub fn build<F, Fut>(self, f: F) -> GeneratorSpec
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.build_from_task(TaskFn::arc(f))
    }

    /// Builds the spec from an existing task.
    pub fn build_from_task(self, task: TaskRef) -> GeneratorSpec {
        GeneratorSpec::new(self.name, task, self.load, self.options)
    }
}
