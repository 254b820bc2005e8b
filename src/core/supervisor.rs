//! Supervisory loop step
//!
//! One [`Supervisor::poll`] call is one iteration of the firmware's
//! cooperative main loop: tick every channel, consume receive completions,
//! feed the decoders, render the cached position and reading at a bounded
//! rate, and run the coarse watchdog that recovers stuck receivers and a
//! wedged console claim.
//!
//! The supervisor owns the decode state (assembler, batcher, parser, cached
//! records); channels, console, LED and clock are owned by the caller and
//! threaded in by reference, so buffer lifetimes stay with the top-level
//! scheduler.

use bitflags::bitflags;

use crate::core::console::Console;
use crate::core::tick::Tick;
use crate::devices::channel::{Channel, RxCompletionKind};
use crate::devices::gps::{decode_gpgll, LineAssembler, NmeaError, PositionRecord, TZ_OFFSET_HOURS};
use crate::devices::pms::{Batcher, PmsParser, PmsReading, PmsStatus};
use crate::platform::traits::{Clock, GpioInterface, UartHw};
use crate::{log_debug, log_error, log_warn};

/// Receive buffer sizes the firmware arms its channels with. A GNSS burst
/// is a handful of sentences; a PMS frame is 32 bytes.
pub const GPS_RX_BUF_SZ: usize = 2048;
pub const PMS_RX_BUF_SZ: usize = 64;

/// Sentence assembly capacity; holds several sentences of backlog.
pub const GPS_ASSEMBLY_CAP: usize = 512;

/// Raw particulate batch capacity.
pub const PMS_BATCH_CAP: usize = 128;

/// Idle-gap timeouts per channel. GNSS sentence boundaries are detected
/// only by a timing gap, so its timeout is generous; the PMS frame gap is
/// tighter; the console echo gap is about three character times at 38400.
pub const GPS_IDLE_TIMEOUT: Tick = Tick::from_millis(5);
pub const PMS_IDLE_TIMEOUT: Tick = Tick::from_millis(2);
pub const CONSOLE_IDLE_TIMEOUT: Tick = Tick::from_micros(781);

bitflags! {
    /// Edge events latched outside the loop (pushbutton ISR) and consumed
    /// once per poll.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PendingEvents: u8 {
        const BUTTON_PRESS = 1 << 0;
        const BUTTON_RELEASE = 1 << 1;
    }
}

/// Supervisor tuning.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Minimum spacing between display renders.
    pub display_interval: Tick,
    /// Inactivity window after which receivers are recovered.
    pub watchdog_timeout: Tick,
    /// Hours added to GNSS UTC timestamps.
    pub tz_offset_hours: i8,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            display_interval: Tick::from_millis(200),
            watchdog_timeout: Tick::from_secs(5),
            tz_offset_hours: TZ_OFFSET_HOURS,
        }
    }
}

/// Decode state and cached records for the combined monitor.
pub struct Supervisor {
    cfg: SupervisorConfig,
    position: PositionRecord,
    reading: PmsReading,
    assembler: LineAssembler<GPS_ASSEMBLY_CAP>,
    batcher: Batcher<PMS_BATCH_CAP>,
    parser: PmsParser,
    last_activity: Tick,
    last_display: Tick,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            position: PositionRecord::default(),
            reading: PmsReading::default(),
            assembler: LineAssembler::new(),
            batcher: Batcher::new(),
            parser: PmsParser::new(),
            last_activity: Tick::ZERO,
            last_display: Tick::ZERO,
        }
    }

    /// Latest cached fix.
    pub fn position(&self) -> &PositionRecord {
        &self.position
    }

    /// Latest cached particulate reading.
    pub fn reading(&self) -> &PmsReading {
        &self.reading
    }

    /// Run one supervisory iteration.
    #[allow(clippy::too_many_arguments)]
    pub fn poll<C, Ug, Up, Uc, G>(
        &mut self,
        clock: &C,
        gps: &mut Channel<'_, Ug>,
        pms: &mut Channel<'_, Up>,
        console_chan: &mut Channel<'_, Uc>,
        console: &mut Console,
        led: &mut G,
        events: PendingEvents,
    ) where
        C: Clock,
        Ug: UartHw,
        Up: UartHw,
        Uc: UartHw,
        G: GpioInterface,
    {
        let now = clock.now();
        let _ = led.set_low();

        gps.tick(now);
        pms.tick(now);
        console_chan.tick(now);

        if events.contains(PendingEvents::BUTTON_PRESS) {
            self.last_activity = now;
            log_debug!("button press");
        }

        // GNSS bytes: assemble lines, decode position fixes, rearm.
        if let Some(done) = gps.take_rx_completion() {
            self.last_activity = now;
            if done.kind() == RxCompletionKind::Data && !done.is_empty() {
                let _ = led.set_high();
                if !self.assembler.push(done.bytes()) {
                    log_warn!("gps assembly overflow, resynchronizing");
                }
                while let Some(line) = self.assembler.next_line() {
                    match decode_gpgll(&line, self.cfg.tz_offset_hours, &mut self.position) {
                        Ok(()) => {}
                        Err(NmeaError::NotGpgll) => {}
                        Err(NmeaError::Truncated) => log_warn!("gps record truncated"),
                    }
                }
            }
            if gps.submit(done.into_descriptor()).is_err() {
                log_error!("gps receiver rearm failed");
            }
        }

        // Particulate bytes: batch raw chunks, rearm.
        if let Some(done) = pms.take_rx_completion() {
            self.last_activity = now;
            if done.kind() == RxCompletionKind::Data && !done.is_empty() {
                if !self.batcher.push(done.bytes(), now) {
                    // Batch full: hand it off first, then retry the chunk.
                    self.feed_batch();
                    if !self.batcher.push(done.bytes(), now) {
                        log_warn!("pms chunk dropped, len={}", done.len());
                    }
                }
            }
            if pms.submit(done.into_descriptor()).is_err() {
                log_error!("pms receiver rearm failed");
            }
        }

        if self.batcher.ready(now) {
            self.feed_batch();
        }

        // Second service pass: tick consumes at most one received word, so
        // ticking only once per iteration would starve reception while the
        // decode stage above runs.
        gps.tick(now);
        pms.tick(now);
        console_chan.tick(now);

        // Rate-limited combined display of the cached records.
        if Tick::delta(now, self.last_display) >= self.cfg.display_interval {
            let rendered = console.write_sync(
                console_chan,
                clock,
                |n| {
                    gps.tick(n);
                    pms.tick(n);
                },
                format_args!(
                    "[GPS] {} [PM] PM1.0: {} ug/m3 | PM2.5: {} ug/m3 | PM10: {} ug/m3",
                    self.position.as_str(),
                    self.reading.pm1_0_atm,
                    self.reading.pm2_5_atm,
                    self.reading.pm10_atm
                ),
            );
            if rendered {
                self.last_display = now;
            }
        }

        // Coarse recovery: a long silence means a receiver or the console
        // claim is wedged. Aborted transfers surface as ordinary
        // completions and get rearmed by the next poll.
        if Tick::delta(now, self.last_activity) >= self.cfg.watchdog_timeout {
            log_warn!("watchdog: no activity, recovering");
            if console.stale(now) {
                console.force_release();
            }
            if gps.rx_busy() {
                gps.rx_abort();
            }
            if pms.rx_busy() {
                pms.rx_abort();
            }
            self.last_activity = now;
        }
    }

    fn feed_batch(&mut self) {
        let mut decoded = false;
        for &b in self.batcher.bytes() {
            match self.parser.feed(b, &mut self.reading) {
                PmsStatus::Complete => decoded = true,
                PmsStatus::Pending => {}
                _ => log_debug!("pms parser resynchronized"),
            }
        }
        // The batch is spent whether or not anything decoded.
        self.batcher.clear();
        if decoded {
            log_debug!("pms reading updated");
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}
