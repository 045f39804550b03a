//! # Per-generator admission control.
//!
//! [`Admission`] is a lock-free counter of in-flight task instances checked
//! against a mutable ceiling (`0` = unlimited).
//!
//! ## Rules
//! - `try_acquire` never blocks: a denied tick is dropped, not queued.
//! - Each granted [`Permit`] releases exactly once, when dropped.
//! - Releasing only touches the counter, so it is safe after the owning
//!   generator was paused or removed.
//! - Lowering the ceiling below the in-flight count cancels nothing; new
//!   admissions are denied until the count drains.
//!
//! ## Example
//! ```rust
//! use loadvisor::Admission;
//!
//! let adm = Admission::new(1);
//! let permit = adm.try_acquire().expect("first admission");
//! assert!(adm.try_acquire().is_none());
//! drop(permit);
//! assert_eq!(adm.in_flight(), 0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded counter of in-flight task instances.
#[derive(Debug, Default)]
pub struct Admission {
    in_flight: AtomicUsize,
    ceiling: AtomicUsize,
}

impl Admission {
    /// Creates a shared admission counter with the given ceiling (`0` = unlimited).
    pub fn new(ceiling: usize) -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicUsize::new(0),
            ceiling: AtomicUsize::new(ceiling),
        })
    }

    /// Tries to admit one task instance.
    ///
    /// Returns `None` when the ceiling is reached.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            let ceiling = self.ceiling.load(Ordering::Acquire);
            if ceiling != 0 && current >= ceiling {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(Permit {
                        admission: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Updates the ceiling (`0` = unlimited).
    pub fn set_ceiling(&self, ceiling: usize) {
        self.ceiling.store(ceiling, Ordering::Release);
    }

    /// Returns the current ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling.load(Ordering::Acquire)
    }

    /// Returns the number of admitted, not yet released, task instances.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Proof of admission; releases its slot on drop.
#[derive(Debug)]
#[must_use = "dropping a permit releases the admission slot immediately"]
pub struct Permit {
    admission: Arc<Admission>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.admission.release();
    }
}
