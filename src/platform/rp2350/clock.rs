//! RP2350 monotonic clock
//!
//! Reads the always-running 64-bit microsecond timer. The raw register pair
//! is sampled with a high-low-high sequence so a carry between the two
//! 32-bit reads cannot produce a torn value.

use rp235x_hal::pac::TIMER0;

use crate::core::tick::Tick;
use crate::platform::traits::Clock;

/// RP2350 monotonic clock over TIMER0.
pub struct Rp2350Clock {
    timer: TIMER0,
}

impl Rp2350Clock {
    pub fn new(timer: TIMER0) -> Self {
        Self { timer }
    }

    fn now_micros(&self) -> u64 {
        loop {
            let hi = self.timer.timerawh().read().bits();
            let lo = self.timer.timerawl().read().bits();
            if hi == self.timer.timerawh().read().bits() {
                return ((hi as u64) << 32) | lo as u64;
            }
        }
    }
}

impl Clock for Rp2350Clock {
    fn now(&self) -> Tick {
        Tick::from_micros64(self.now_micros())
    }
}
