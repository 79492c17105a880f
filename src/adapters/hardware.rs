//! Hardware adapter: bridges board peripherals to the console ports.
//!
//! Owns the indicator and battery drivers plus the clock, exposing them
//! through [`SystemPort`] and [`IndicatorPort`]. On non-espidf targets
//! the underlying drivers use cfg-gated simulation stubs.

use log::info;

use crate::app::ports::{BatteryStatus, IndicatorPort, SystemInfo, SystemPort};
use crate::drivers::battery::BatteryMonitor;
use crate::drivers::hw_init;
use crate::drivers::indicator::Indicator;
use crate::error::SensorError;

use super::time::MonotonicClock;

#[cfg(target_os = "espidf")]
const BOARD_NAME: &str = "esp32s3-devkitc";
#[cfg(target_os = "espidf")]
const SOC_NAME: &str = "ESP32-S3";

#[cfg(not(target_os = "espidf"))]
const BOARD_NAME: &str = "host-sim";
#[cfg(not(target_os = "espidf"))]
const SOC_NAME: &str = "host";

/// Readings outside this window are treated as sensor faults.
const TEMP_RANGE_C: core::ops::RangeInclusive<i32> = -40..=125;

pub struct BoardAdapter {
    indicator: Indicator,
    battery: BatteryMonitor,
    clock: MonotonicClock,
    /// Simulation: set when `reboot` was called.
    #[cfg(not(target_os = "espidf"))]
    sim_rebooted: bool,
}

impl BoardAdapter {
    pub fn new(indicator: Indicator, clock: MonotonicClock) -> Self {
        Self {
            indicator,
            battery: BatteryMonitor,
            clock,
            #[cfg(not(target_os = "espidf"))]
            sim_rebooted: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_rebooted(&self) -> bool {
        self.sim_rebooted
    }

    #[cfg(target_os = "espidf")]
    fn platform_free_heap(&self) -> u32 {
        // SAFETY: read-only heap statistics query.
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_free_heap(&self) -> u32 {
        0
    }
}

// ── SystemPort implementation ─────────────────────────────────

impl SystemPort for BoardAdapter {
    fn battery_status(&mut self) -> Result<BatteryStatus, SensorError> {
        self.battery.read()
    }

    fn temperature_celsius(&mut self) -> Result<i32, SensorError> {
        let celsius = hw_init::die_temperature()?.round() as i32;
        if TEMP_RANGE_C.contains(&celsius) {
            Ok(celsius)
        } else {
            Err(SensorError::OutOfRange)
        }
    }

    fn uptime_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }

    fn free_heap_bytes(&self) -> u32 {
        self.platform_free_heap()
    }

    fn system_info(&mut self) -> Result<SystemInfo, SensorError> {
        Ok(SystemInfo {
            board_name: BOARD_NAME,
            soc_name: SOC_NAME,
            uptime_ms: self.uptime_ms(),
            free_heap_bytes: self.free_heap_bytes(),
        })
    }

    #[cfg(target_os = "espidf")]
    fn reboot(&mut self) {
        info!("BOARD: restarting");
        // SAFETY: esp_restart does not return.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn reboot(&mut self) {
        info!("BOARD(sim): reboot requested");
        self.sim_rebooted = true;
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl IndicatorPort for BoardAdapter {
    fn set_indicator(&mut self, on: bool) {
        self.indicator.set(on);
    }

    fn toggle_indicator(&mut self) {
        self.indicator.toggle();
    }

    fn indicator_is_on(&self) -> bool {
        self.indicator.is_on()
    }
}
