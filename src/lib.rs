#![cfg_attr(not(test), no_std)]

//! pico_airmon - GPS + particulate-matter air monitor firmware core
//!
//! This library provides platform abstraction, polled UART channel drivers,
//! NMEA and PMS frame decoding, and the supervisory loop step for a combined
//! position/air-quality monitor on the Raspberry Pi Pico 2 W.

// Platform abstraction layer
pub mod platform;

// Device drivers using platform abstraction
pub mod devices;

// Core runtime (tick timestamps, console, supervisor, logging)
pub mod core;
