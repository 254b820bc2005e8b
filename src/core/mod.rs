//! Core runtime functionality
//!
//! This module contains the pieces the cooperative loop is built from: the
//! tick timestamp, the synchronous debug console, the supervisory step, and
//! the logging macros.

pub mod console;
pub mod logging;
pub mod supervisor;
pub mod tick;
