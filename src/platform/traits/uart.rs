//! UART hardware interface trait
//!
//! This module defines the byte-level register contract the channel driver
//! polls against. Implementations expose one received word at a time as a
//! status read followed by a data read; the status read must latch the word
//! so the subsequent data read returns the byte the flags describe.

use bitflags::bitflags;

use crate::core::tick::Tick;

bitflags! {
    /// Per-byte receive error flags, captured together with the data byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxFlags: u8 {
        /// Framing error (missing stop bit)
        const FRAMING = 1 << 0;
        /// Parity error
        const PARITY = 1 << 1;
        /// Break condition on the line
        const BREAK = 1 << 2;
        /// Receiver overrun (earlier bytes were lost)
        const OVERRUN = 1 << 3;
    }
}

/// Static UART channel configuration, fixed at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    /// Baud divisor in the platform's native fixed-point encoding
    /// (integer part in the high bits, 6-bit fractional part in the low bits).
    pub baud_div: u32,
    /// Receive gap after which a partially filled buffer completes.
    pub idle_timeout: Tick,
}

impl UartConfig {
    pub const fn new(baud_div: u32, idle_timeout: Tick) -> Self {
        Self {
            baud_div,
            idle_timeout,
        }
    }
}

/// UART hardware register contract
///
/// # Safety Invariants
///
/// - `rx_status` must be called before `rx_data` for each received word;
///   the status read latches the word the data read returns.
/// - `rx_data` consumes the latched word; calling it again without a new
///   `rx_ready`/`rx_status` cycle is a contract violation.
/// - Only one owner per peripheral instance.
pub trait UartHw {
    /// A received word is waiting to be read.
    fn rx_ready(&self) -> bool;

    /// Read and latch the status of the pending word.
    fn rx_status(&mut self) -> RxFlags;

    /// Read the latched data byte, consuming the word.
    fn rx_data(&mut self) -> u8;

    /// The transmit holding path can accept another byte.
    fn tx_ready(&self) -> bool;

    /// Write one byte into the transmit holding path.
    fn tx_write(&mut self, byte: u8);

    /// The transmitter is deeply idle: holding path empty and the shifter
    /// done with the final stop bit. Distinct from `tx_ready`, which only
    /// says there is room for more.
    fn tx_idle(&self) -> bool;
}
