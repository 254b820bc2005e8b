//! Monotonic tick timestamps
//!
//! Split-second timestamps maintained by the periodic system tick. Stored as
//! whole seconds plus nanoseconds so long uptimes keep full resolution, with
//! a subtraction that stays correct across a single wraparound of the
//! seconds counter.

/// Nominal period between system tick advances, in microseconds.
pub const TICK_PERIOD_US: u32 = 5_000;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Monotonic split-second timestamp.
///
/// Ordering is lexicographic on `(secs, nanos)`, which matches chronological
/// order for normalized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    pub secs: u32,
    pub nanos: u32,
}

impl Tick {
    pub const ZERO: Tick = Tick { secs: 0, nanos: 0 };

    /// Build a timestamp, folding excess nanoseconds into seconds.
    pub const fn new(secs: u32, nanos: u32) -> Self {
        Tick {
            secs: secs.wrapping_add(nanos / NANOS_PER_SEC),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    pub const fn from_micros(us: u32) -> Self {
        Tick {
            secs: us / 1_000_000,
            nanos: (us % 1_000_000) * 1_000,
        }
    }

    pub const fn from_millis(ms: u32) -> Self {
        Tick {
            secs: ms / 1_000,
            nanos: (ms % 1_000) * 1_000_000,
        }
    }

    pub const fn from_secs(secs: u32) -> Self {
        Tick { secs, nanos: 0 }
    }

    /// Build a timestamp from a 64-bit microsecond counter. The seconds
    /// component truncates to 32 bits, which keeps deltas valid across a
    /// single wrap.
    pub const fn from_micros64(us: u64) -> Self {
        Tick {
            secs: (us / 1_000_000) as u32,
            nanos: ((us % 1_000_000) as u32) * 1_000,
        }
    }

    /// Advance by the nominal tick period.
    pub fn advance_tick(&mut self) {
        self.nanos += TICK_PERIOD_US * 1_000;
        if self.nanos >= NANOS_PER_SEC {
            self.nanos -= NANOS_PER_SEC;
            self.secs = self.secs.wrapping_add(1);
        }
    }

    /// Elapsed time `lhs - rhs`, assuming at most one wraparound of the
    /// seconds counter between the two samples.
    pub fn delta(lhs: Tick, rhs: Tick) -> Tick {
        let mut secs = if lhs.secs >= rhs.secs {
            lhs.secs - rhs.secs
        } else {
            // Wrapped: distance to the top plus the part after the wrap.
            (u32::MAX - rhs.secs) + lhs.secs + 1
        };
        let nanos = if lhs.nanos >= rhs.nanos {
            lhs.nanos - rhs.nanos
        } else {
            // Borrow one second for the nanosecond subtraction.
            secs = secs.wrapping_sub(1);
            (NANOS_PER_SEC - rhs.nanos) + lhs.nanos
        };
        Tick { secs, nanos }
    }

    /// Elapsed microseconds since `earlier`, saturating at `u64::MAX`.
    pub fn micros_since(self, earlier: Tick) -> u64 {
        let d = Tick::delta(self, earlier);
        (d.secs as u64)
            .saturating_mul(1_000_000)
            .saturating_add((d.nanos / 1_000) as u64)
    }
}
