//! GPIO / peripheral pin assignments for the console board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

/// Status LED, active HIGH.
pub const INDICATOR_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Battery sense (ADC1)
// ---------------------------------------------------------------------------

/// Battery voltage through a 1:2 resistive divider.
/// ADC1 channel 3 (GPIO 4 on ESP32-S3).
pub const BATTERY_ADC_CHANNEL: u32 = 3;
/// Divider ratio between the cell and the ADC pin.
pub const BATTERY_DIVIDER: u32 = 2;
/// Full-scale input of ADC1 at 12 dB attenuation (mV).
pub const ADC_FULL_SCALE_MV: u32 = 3100;
