//! Synchronous debug console
//!
//! Formats one line at a time and pushes it out the console UART while the
//! caller waits. The console shares its channel with nothing else, but the
//! wait loops keep servicing the other channels through a caller-supplied
//! closure so a slow console line cannot starve the receivers.
//!
//! A busy claim is held from submission until the hardware transmitter has
//! fully drained, not merely until the holding path has room. If a write
//! times out mid-drain the claim stays held; the supervisor's watchdog
//! detects the stale claim and releases it.

use core::fmt;
use core::fmt::Write;

use heapless::String;

use crate::core::tick::Tick;
use crate::devices::channel::Channel;
use crate::platform::traits::{Clock, UartHw};

/// Capacity of one rendered console line, tag and CRLF included.
pub const CONSOLE_LINE_CAP: usize = 256;

/// Fixed tag prepended to every line.
pub const CONSOLE_TAG: &str = "[airmon] ";

/// Budget for one whole write, idle-wait included.
pub const CONSOLE_WRITE_TIMEOUT: Tick = Tick::from_millis(50);

/// A claim older than this is considered wedged.
pub const CONSOLE_STALE_TIMEOUT: Tick = Tick::from_secs(1);

pub struct Console {
    buf: String<CONSOLE_LINE_CAP>,
    busy: bool,
    busy_since: Tick,
}

impl Console {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            busy: false,
            busy_since: Tick::ZERO,
        }
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    /// The claim has been held past [`CONSOLE_STALE_TIMEOUT`].
    pub fn stale(&self, now: Tick) -> bool {
        self.busy && Tick::delta(now, self.busy_since) >= CONSOLE_STALE_TIMEOUT
    }

    /// Drop a wedged claim. Watchdog recovery path.
    pub fn force_release(&mut self) {
        self.busy = false;
    }

    /// Write one formatted line synchronously.
    ///
    /// Three steps: spin until the transmitter is deeply idle, then claim
    /// the console and submit the rendered line, then spin until the line
    /// has fully left the wire and release the claim. `service` is invoked
    /// on every spin iteration so other channels keep moving.
    ///
    /// Returns false without side effects when the console is already
    /// claimed, the line does not fit, or the idle wait times out. Returns
    /// false with the claim still held when the drain wait times out.
    pub fn write_sync<U, C, F>(
        &mut self,
        chan: &mut Channel<'_, U>,
        clock: &C,
        mut service: F,
        args: fmt::Arguments<'_>,
    ) -> bool
    where
        U: UartHw,
        C: Clock,
        F: FnMut(Tick),
    {
        if self.busy {
            return false;
        }
        let start = clock.now();

        // Step 1: wait out any earlier traffic still on the wire.
        loop {
            let now = clock.now();
            chan.tick(now);
            service(now);
            if chan.tx_hw_idle() {
                break;
            }
            if Tick::delta(now, start) >= CONSOLE_WRITE_TIMEOUT {
                return false;
            }
        }

        // Step 2: claim, render, submit.
        self.buf.clear();
        if self.buf.push_str(CONSOLE_TAG).is_err()
            || self.buf.write_fmt(args).is_err()
            || self.buf.push_str("\r\n").is_err()
        {
            self.buf.clear();
            return false;
        }
        self.busy = true;
        self.busy_since = clock.now();
        if chan.enqueue(&[self.buf.as_bytes()]).is_err() {
            self.busy = false;
            return false;
        }

        // Step 3: hold the claim until this line has fully drained.
        loop {
            let now = clock.now();
            chan.tick(now);
            service(now);
            if chan.tx_hw_idle() {
                self.busy = false;
                return true;
            }
            if Tick::delta(now, start) >= CONSOLE_WRITE_TIMEOUT {
                // Claim stays held; the watchdog will clear it.
                return false;
            }
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
