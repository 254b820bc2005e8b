//! RP2350 UART implementation
//!
//! Implements the [`UartHw`] register contract directly over a PL011
//! register block. The FIFOs are left disabled so every received byte
//! surfaces its own framing/parity/break/overrun flags, which is what the
//! channel driver's per-byte error handling expects.

use core::ops::Deref;

use rp235x_hal::pac::uart0::RegisterBlock;

use crate::platform::traits::{RxFlags, UartConfig, UartHw};

/// RP2350 UART implementation
///
/// The peripheral clocks and pin functions must already be set up; the
/// constructor only programs the divisor, frame format and enables.
pub struct Rp2350Uart<D>
where
    D: Deref<Target = RegisterBlock>,
{
    dev: D,
    latched: Option<(u8, RxFlags)>,
}

impl<D> Rp2350Uart<D>
where
    D: Deref<Target = RegisterBlock>,
{
    /// Take ownership of a UART block and configure it for 8N1 polling
    /// operation.
    ///
    /// `cfg.baud_div` carries the PL011 divisor: integer part in the high
    /// bits, 6-bit fractional part in the low bits.
    pub fn new(dev: D, cfg: &UartConfig) -> Self {
        dev.uartcr().write(|w| w.uarten().clear_bit());
        dev.uartibrd()
            .write(|w| unsafe { w.baud_divint().bits((cfg.baud_div >> 6) as u16) });
        dev.uartfbrd()
            .write(|w| unsafe { w.baud_divfrac().bits((cfg.baud_div & 0x3F) as u8) });
        // 8 data bits, no parity, one stop bit, FIFOs off so status is
        // reported per byte.
        dev.uartlcr_h()
            .write(|w| unsafe { w.wlen().bits(0b11).fen().clear_bit() });
        dev.uartcr()
            .write(|w| w.uarten().set_bit().txe().set_bit().rxe().set_bit());
        Self { dev, latched: None }
    }
}

impl<D> UartHw for Rp2350Uart<D>
where
    D: Deref<Target = RegisterBlock>,
{
    fn rx_ready(&self) -> bool {
        self.latched.is_some() || self.dev.uartfr().read().rxfe().bit_is_clear()
    }

    fn rx_status(&mut self) -> RxFlags {
        // The PL011 delivers data and status in one UARTDR read; latch the
        // whole word so rx_data returns the byte these flags describe.
        if self.latched.is_none() {
            let dr = self.dev.uartdr().read();
            let mut flags = RxFlags::empty();
            if dr.fe().bit_is_set() {
                flags |= RxFlags::FRAMING;
            }
            if dr.pe().bit_is_set() {
                flags |= RxFlags::PARITY;
            }
            if dr.be().bit_is_set() {
                flags |= RxFlags::BREAK;
            }
            if dr.oe().bit_is_set() {
                flags |= RxFlags::OVERRUN;
            }
            self.latched = Some((dr.data().bits(), flags));
        }
        self.latched.map(|(_, f)| f).unwrap_or_default()
    }

    fn rx_data(&mut self) -> u8 {
        self.latched.take().map(|(b, _)| b).unwrap_or(0)
    }

    fn tx_ready(&self) -> bool {
        self.dev.uartfr().read().txff().bit_is_clear()
    }

    fn tx_write(&mut self, byte: u8) {
        self.dev.uartdr().write(|w| unsafe { w.data().bits(byte) });
    }

    fn tx_idle(&self) -> bool {
        // Holding register empty and the shifter done with the stop bit.
        let fr = self.dev.uartfr().read();
        fr.txfe().bit_is_set() && fr.busy().bit_is_clear()
    }
}
