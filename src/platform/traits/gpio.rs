//! GPIO interface trait
//!
//! This module defines the output-pin interface that platform implementations
//! must provide (status LED, sensor control lines).

use crate::platform::Result;

/// GPIO output interface trait
///
/// # Safety Invariants
///
/// - GPIO pin must be initialized as an output before use
/// - Only one owner per GPIO pin instance
pub trait GpioInterface {
    /// Set GPIO pin high (logic level 1)
    fn set_high(&mut self) -> Result<()>;

    /// Set GPIO pin low (logic level 0)
    fn set_low(&mut self) -> Result<()>;
}
