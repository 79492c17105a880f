//! Port traits: the hexagonal boundary between the console and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConsoleHandlers / command table
//! ```
//!
//! The command handlers and the status line only ever see these traits,
//! so every platform reading can be faked in tests.

use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Data carried across the ports
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub voltage_mv: u16,
    /// 0–100.
    pub percentage: u8,
    pub is_charging: bool,
    pub is_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub board_name: &'static str,
    pub soc_name: &'static str,
    pub uptime_ms: u64,
    pub free_heap_bytes: u32,
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: board → console)
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    fn battery_status(&mut self) -> Result<BatteryStatus, SensorError>;

    /// Die temperature in whole degrees Celsius.
    fn temperature_celsius(&mut self) -> Result<i32, SensorError>;

    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    fn free_heap_bytes(&self) -> u32;

    fn system_info(&mut self) -> Result<SystemInfo, SensorError>;

    /// Restart the SoC. Real hardware does not return.
    fn reboot(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: console → LED)
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    fn set_indicator(&mut self, on: bool);

    fn toggle_indicator(&mut self);

    fn indicator_is_on(&self) -> bool;
}

/// Everything a command handler may touch, as one object-safe bundle.
pub trait Platform: SystemPort + IndicatorPort {}

impl<T: SystemPort + IndicatorPort> Platform for T {}
