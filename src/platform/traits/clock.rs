//! Monotonic clock trait
//!
//! A read-only time source. The firmware never sleeps on it; all waiting is
//! done by polling deltas between [`Tick`] samples.

use crate::core::tick::Tick;

/// Monotonic clock interface
pub trait Clock {
    /// Current monotonic timestamp.
    fn now(&self) -> Tick;
}
