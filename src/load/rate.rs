//! # Rate model: from intensity to dispatch instants.
//!
//! [`RateModel`] turns the current intensity `λ` of a [`LoadSpec`] into the
//! next scheduler [`Tick`].
//!
//! ## Sampling
//! ```text
//! λ = spec.intensity(elapsed)
//!   ├─ λ < 0, NaN, ±inf → Err(InvalidRate)
//!   ├─ λ == 0           → Recheck(idle_poll)
//!   └─ λ > 0            → w ~ Exp(λ) seconds
//!                          ├─ w <= horizon → Fire(w)
//!                          └─ w >  horizon → Recheck(horizon)
//! ```
//!
//! The intensity is treated as constant over one sampled interval. Because the
//! exponential distribution is memoryless, cutting a long sample at `horizon`
//! and re-sampling against the new `λ` is exact for a rate that is piecewise
//! constant over horizon-sized windows, so the long-run number of dispatches
//! tracks the integral of the load spec.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};

use crate::error::RateError;
use crate::load::spec::LoadSpec;

/// What a scheduler should do after sleeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Sleep for the duration, then dispatch one task instance.
    Fire(Duration),
    /// Sleep for the duration, then re-evaluate the load spec without dispatching.
    Recheck(Duration),
}

impl Tick {
    /// Returns the sleep duration carried by the tick.
    #[inline]
    pub fn wait(&self) -> Duration {
        match self {
            Tick::Fire(d) | Tick::Recheck(d) => *d,
        }
    }
}

/// Per-generator inter-arrival sampler.
///
/// Owns its RNG so generators never contend on shared random state.
#[derive(Debug)]
pub struct RateModel {
    rng: StdRng,
    idle_poll: Duration,
    horizon: Duration,
}

impl RateModel {
    /// Creates a model seeded from the operating system.
    pub fn new(idle_poll: Duration, horizon: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), idle_poll, horizon)
    }

    /// Creates a model with a fixed seed (reproducible dispatch sequences).
    pub fn seeded(seed: u64, idle_poll: Duration, horizon: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), idle_poll, horizon)
    }

    fn with_rng(rng: StdRng, idle_poll: Duration, horizon: Duration) -> Self {
        Self {
            rng,
            idle_poll: idle_poll.max(Duration::from_millis(1)),
            horizon: horizon.max(Duration::from_millis(1)),
        }
    }

    /// Poll interval used while the intensity is zero.
    #[inline]
    pub fn idle_poll(&self) -> Duration {
        self.idle_poll
    }

    /// Longest wait handed out before the load spec is re-evaluated.
    #[inline]
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Computes the next tick for `spec` at active time `elapsed`.
    ///
    /// Never returns a negative or non-finite wait; an unusable intensity is
    /// surfaced as [`RateError::InvalidRate`] instead of being clamped.
    pub fn next_tick<S: LoadSpec + ?Sized>(
        &mut self,
        spec: &S,
        elapsed: Duration,
    ) -> Result<Tick, RateError> {
        let lambda = spec.intensity(elapsed);
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(RateError::InvalidRate {
                value: lambda,
                elapsed,
            });
        }
        if lambda == 0.0 {
            return Ok(Tick::Recheck(self.idle_poll));
        }

        let exp = Exp::new(lambda).map_err(|_| RateError::InvalidRate {
            value: lambda,
            elapsed,
        })?;
        let secs: f64 = exp.sample(&mut self.rng);

        match Duration::try_from_secs_f64(secs) {
            Ok(wait) if wait <= self.horizon => Ok(Tick::Fire(wait)),
            _ => Ok(Tick::Recheck(self.horizon)),
        }
    }
}
