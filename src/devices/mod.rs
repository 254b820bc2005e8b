//! Device drivers
//!
//! This module contains device drivers that use platform abstraction traits,
//! so the same code runs against hardware and the mock platform.
//!
//! ## Modules
//!
//! - `channel`: polling UART channel driver (descriptor RX, staged TX)
//! - `gps`: NMEA `$GPGLL` decoding and sentence assembly
//! - `pms`: PMS-family particulate sensor frame parser

pub mod channel;
pub mod gps;
pub mod pms;
