//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod clock;
pub mod gpio;
pub mod uart;

// Re-export trait interfaces
pub use clock::Clock;
pub use gpio::GpioInterface;
pub use uart::{RxFlags, UartConfig, UartHw};
