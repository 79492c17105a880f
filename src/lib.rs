//! Wireless serial console firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod shell;
pub mod transport;

mod pins;

// The ESP-IDF adapters compile on the host with simulation stubs inside.
pub mod adapters;
pub mod drivers;
