//! # Load specs: intensity as a function of active elapsed time.
//!
//! A [`LoadSpec`] maps the generator's active elapsed time to a target
//! intensity in calls per second. Any `Fn(Duration) -> f64` closure is a load
//! spec; [`LoadShape`] covers the usual curves without writing one.
//!
//! ## Shapes
//! ```text
//! Constant   ────────────────
//! Ramp       ____/‾‾‾‾‾‾‾‾‾‾‾
//! Steps      __‾‾‾‾__‾‾‾‾‾‾
//! Sine       ∿∿∿∿∿∿∿∿∿∿∿∿∿∿∿
//! Spike      ______/\________
//! ```
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use loadvisor::{LoadShape, LoadSpec};
//!
//! let ramp = LoadShape::Ramp { from: 0.0, to: 100.0, over: Duration::from_secs(10) };
//! assert_eq!(ramp.intensity(Duration::from_secs(5)), 50.0);
//! assert_eq!(ramp.intensity(Duration::from_secs(60)), 100.0);
//!
//! let custom = |t: Duration| if t < Duration::from_secs(1) { 0.0 } else { 5.0 };
//! assert_eq!(custom.intensity(Duration::from_secs(2)), 5.0);
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a load spec.
pub type LoadSpecRef = Arc<dyn LoadSpec>;

/// Target intensity (calls/sec) as a function of active elapsed time.
///
/// Implementations must be cheap and side-effect free: the scheduler calls
/// them once per tick. Returning a negative or non-finite value is reported as
/// [`RateError::InvalidRate`](crate::RateError::InvalidRate) and skips the tick.
pub trait LoadSpec: Send + Sync + 'static {
    /// Returns the intensity at `elapsed`.
    fn intensity(&self, elapsed: Duration) -> f64;
}

impl<F> LoadSpec for F
where
    F: Fn(Duration) -> f64 + Send + Sync + 'static,
{
    fn intensity(&self, elapsed: Duration) -> f64 {
        self(elapsed)
    }
}

/// Built-in intensity curves.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadShape {
    /// Same intensity forever.
    Constant(f64),

    /// Linear ramp from `from` to `to` over `over`, then holds `to`.
    Ramp {
        /// Intensity at `t = 0`.
        from: f64,
        /// Intensity from `t = over` on.
        to: f64,
        /// Ramp length (`0` jumps to `to` immediately).
        over: Duration,
    },

    /// Piecewise constant: each `(start, intensity)` holds until the next start.
    ///
    /// Entries may be in any order; the latest start not after the elapsed
    /// time wins. Before the first start the intensity is `0`.
    Steps(Vec<(Duration, f64)>),

    /// `base + amplitude * sin(2π t / period)`, clamped at `0`.
    Sine {
        /// Mean intensity.
        base: f64,
        /// Swing around `base`.
        amplitude: f64,
        /// Full cycle length (`0` degrades to `base`).
        period: Duration,
    },

    /// Triangular burst of height `peak` centred at `at`, `width` wide, on top of `base`.
    Spike {
        /// Background intensity.
        base: f64,
        /// Intensity at the tip of the spike.
        peak: f64,
        /// Centre of the spike.
        at: Duration,
        /// Total width of the spike (`0` disables it).
        width: Duration,
    },
}

impl LoadShape {
    /// Builds a [`LoadShape::Steps`] with entries sorted by start offset.
    pub fn steps(mut steps: Vec<(Duration, f64)>) -> Self {
        steps.sort_by_key(|(start, _)| *start);
        LoadShape::Steps(steps)
    }

    /// Wraps the shape into a shared [`LoadSpecRef`].
    pub fn into_ref(self) -> LoadSpecRef {
        Arc::new(self)
    }
}

impl LoadSpec for LoadShape {
    fn intensity(&self, elapsed: Duration) -> f64 {
        match self {
            LoadShape::Constant(rate) => *rate,
            LoadShape::Ramp { from, to, over } => {
                if elapsed >= *over {
                    return *to;
                }
                let progress = elapsed.as_secs_f64() / over.as_secs_f64();
                from + (to - from) * progress
            }
            LoadShape::Steps(steps) => steps
                .iter()
                .filter(|(start, _)| *start <= elapsed)
                .max_by_key(|(start, _)| *start)
                .map_or(0.0, |(_, rate)| *rate),
            LoadShape::Sine {
                base,
                amplitude,
                period,
            } => {
                if period.is_zero() {
                    return *base;
                }
                let phase = elapsed.as_secs_f64() / period.as_secs_f64();
                (base + amplitude * (TAU * phase).sin()).max(0.0)
            }
            LoadShape::Spike {
                base,
                peak,
                at,
                width,
            } => {
                let half = width.as_secs_f64() / 2.0;
                if half == 0.0 {
                    return *base;
                }
                let distance = (elapsed.as_secs_f64() - at.as_secs_f64()).abs();
                if distance >= half {
                    *base
                } else {
                    base + (peak - base) * (1.0 - distance / half)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn ramp_interpolates_then_holds() {
        let ramp = LoadShape::Ramp {
            from: 10.0,
            to: 20.0,
            over: secs(4.0),
        };
        assert_eq!(ramp.intensity(Duration::ZERO), 10.0);
        assert_eq!(ramp.intensity(secs(1.0)), 12.5);
        assert_eq!(ramp.intensity(secs(4.0)), 20.0);
        assert_eq!(ramp.intensity(secs(100.0)), 20.0);
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let ramp = LoadShape::Ramp {
            from: 1.0,
            to: 7.0,
            over: Duration::ZERO,
        };
        assert_eq!(ramp.intensity(Duration::ZERO), 7.0);
    }

    #[test]
    fn steps_are_sorted_and_hold_until_next() {
        let steps = LoadShape::steps(vec![(secs(5.0), 50.0), (secs(1.0), 10.0)]);
        assert_eq!(steps.intensity(secs(0.5)), 0.0);
        assert_eq!(steps.intensity(secs(1.0)), 10.0);
        assert_eq!(steps.intensity(secs(4.9)), 10.0);
        assert_eq!(steps.intensity(secs(5.0)), 50.0);
        assert_eq!(steps.intensity(secs(500.0)), 50.0);
    }

    #[test]
    fn unsorted_steps_built_directly_pick_the_latest_start() {
        let steps = LoadShape::Steps(vec![
            (secs(5.0), 50.0),
            (secs(1.0), 10.0),
            (secs(3.0), 30.0),
        ]);
        assert_eq!(steps.intensity(secs(0.5)), 0.0);
        assert_eq!(steps.intensity(secs(2.0)), 10.0);
        assert_eq!(steps.intensity(secs(3.5)), 30.0);
        assert_eq!(steps.intensity(secs(6.0)), 50.0);
    }

    #[test]
    fn sine_is_clamped_at_zero() {
        let sine = LoadShape::Sine {
            base: 1.0,
            amplitude: 5.0,
            period: secs(4.0),
        };
        assert!((sine.intensity(secs(1.0)) - 6.0).abs() < 1e-9);
        assert_eq!(sine.intensity(secs(3.0)), 0.0);
        for i in 0..100 {
            assert!(sine.intensity(secs(i as f64 * 0.07)) >= 0.0);
        }
    }

    #[test]
    fn spike_peaks_at_centre() {
        let spike = LoadShape::Spike {
            base: 2.0,
            peak: 12.0,
            at: secs(10.0),
            width: secs(2.0),
        };
        assert_eq!(spike.intensity(secs(0.0)), 2.0);
        assert_eq!(spike.intensity(secs(10.0)), 12.0);
        assert!((spike.intensity(secs(10.5)) - 7.0).abs() < 1e-9);
        assert_eq!(spike.intensity(secs(11.0)), 2.0);
    }

    #[test]
    fn closures_are_load_specs() {
        let spec: LoadSpecRef = Arc::new(|t: Duration| t.as_secs_f64() * 2.0);
        assert_eq!(spec.intensity(secs(3.0)), 6.0);
    }
}
