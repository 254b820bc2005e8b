//! RP2350 GPIO implementation
//!
//! This module provides GPIO support for RP2350 using the `rp235x-hal` crate.

use rp235x_hal::gpio::{FunctionSioOutput, Pin, PinId, PullType};

use crate::platform::traits::GpioInterface;
use crate::platform::Result;

/// RP2350 GPIO output implementation
///
/// Wraps an `rp235x-hal` SIO output pin to implement the `GpioInterface`
/// trait.
pub struct Rp2350Gpio<I: PinId, P: PullType> {
    pin: Pin<I, FunctionSioOutput, P>,
}

impl<I: PinId, P: PullType> Rp2350Gpio<I, P> {
    pub fn new(pin: Pin<I, FunctionSioOutput, P>) -> Self {
        Self { pin }
    }
}

impl<I: PinId, P: PullType> GpioInterface for Rp2350Gpio<I, P> {
    fn set_high(&mut self) -> Result<()> {
        use embedded_hal::digital::OutputPin;
        // Infallible on RP2350 SIO pins.
        let _ = self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<()> {
        use embedded_hal::digital::OutputPin;
        let _ = self.pin.set_low();
        Ok(())
    }
}
