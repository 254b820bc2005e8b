//! Mock platform implementation for testing
//!
//! This module provides mock implementations of platform traits that can be
//! used for unit testing without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled
//!
//! Built on `heapless` and interior mutability only, so it also works in
//! `no_std` simulations.

#![cfg(any(test, feature = "mock"))]

mod clock;
mod gpio;
mod uart;

pub use clock::MockClock;
pub use gpio::MockGpio;
pub use uart::MockUart;
