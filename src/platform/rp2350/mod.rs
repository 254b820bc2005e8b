//! RP2350 platform implementation for Raspberry Pi Pico 2 W
//!
//! This module provides concrete implementations of the platform abstraction
//! traits for the RP2350 microcontroller using the `rp235x-hal` crate.
//!
//! # Feature Gate
//!
//! This module is only available when the `pico2_w` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! pico-airmon = { version = "0.1", features = ["pico2_w"] }
//! ```

mod clock;
mod gpio;
mod uart;

pub use clock::Rp2350Clock;
pub use gpio::Rp2350Gpio;
pub use uart::Rp2350Uart;
