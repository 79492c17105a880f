//! Li-ion battery monitor.
//!
//! Samples the divided cell voltage on ADC1 and maps it linearly onto a
//! charge percentage:
//!
//! ```text
//!   0 % ─────────────── linear ─────────────── 100 %
//!   3000 mV                                    4200 mV
//! ```

use crate::app::ports::BatteryStatus;
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::pins;

const EMPTY_MV: u32 = 3000;
const FULL_MV: u32 = 4200;
/// Below this the pack is treated as absent.
const PRESENT_MV: u16 = 1000;
const ADC_MAX: u32 = 4095;

/// Cell voltage for a raw 12-bit sample.
pub fn raw_to_millivolts(raw: u16) -> u16 {
    let pin_mv = u32::from(raw).min(ADC_MAX) * pins::ADC_FULL_SCALE_MV / ADC_MAX;
    (pin_mv * pins::BATTERY_DIVIDER) as u16
}

/// Charge estimate, clamped to 0–100.
pub fn percentage(voltage_mv: u16) -> u8 {
    let mv = u32::from(voltage_mv);
    if mv <= EMPTY_MV {
        0
    } else if mv >= FULL_MV {
        100
    } else {
        ((mv - EMPTY_MV) * 100 / (FULL_MV - EMPTY_MV)) as u8
    }
}

pub struct BatteryMonitor;

impl BatteryMonitor {
    pub fn read(&self) -> Result<BatteryStatus, SensorError> {
        let raw = hw_init::adc1_read(pins::BATTERY_ADC_CHANNEL)?;
        let voltage_mv = raw_to_millivolts(raw);
        Ok(BatteryStatus {
            voltage_mv,
            percentage: percentage(voltage_mv),
            // No charge-detect line on this board.
            is_charging: false,
            is_present: voltage_mv > PRESENT_MV,
        })
    }
}
