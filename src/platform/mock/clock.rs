//! Mock clock implementation for testing
//!
//! Manually advanced time source. Tests drive it forward between polls to
//! trigger idle timeouts, display intervals and watchdog deadlines.

use core::cell::Cell;

use crate::core::tick::Tick;
use crate::platform::traits::Clock;

/// Mock monotonic clock
#[derive(Debug)]
pub struct MockClock {
    now: Cell<Tick>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Tick::ZERO),
        }
    }

    pub fn set(&self, t: Tick) {
        self.now.set(t);
    }

    pub fn advance(&self, d: Tick) {
        let n = self.now.get();
        self.now
            .set(Tick::new(n.secs.wrapping_add(d.secs), n.nanos + d.nanos));
    }

    pub fn advance_micros(&self, us: u32) {
        self.advance(Tick::from_micros(us));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Tick {
        self.now.get()
    }
}

impl Clock for &MockClock {
    fn now(&self) -> Tick {
        (*self).now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_advances() {
        let clock = MockClock::new();
        assert_eq!(clock.now(), Tick::ZERO);
        clock.advance_micros(1_500_000);
        assert_eq!(clock.now(), Tick::new(1, 500_000_000));
    }
}
