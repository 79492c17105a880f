//! One-shot hardware peripheral initialization.
//!
//! Configures the indicator GPIO, the battery ADC channel and the on-die
//! temperature sensor using raw ESP-IDF sys calls. Called once from
//! `main()` before the console starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::SensorError;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    TempSensorFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::TempSensorFailed(rc) => write!(f, "temperature sensor init failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
use crate::pins;

/// Configure every peripheral. The indicator is mandatory; battery and
/// temperature sensing degrade to "unavailable" when their setup fails.
#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the console starts; single-threaded.
    unsafe {
        init_indicator_gpio()?;
        if let Err(e) = init_adc() {
            warn!("hw_init: {}, battery readings unavailable", e);
        }
        if let Err(e) = init_temp_sensor() {
            warn!("hw_init: {}, temperature unavailable", e);
        }
    }
    info!("hw_init: peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO output ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_indicator_gpio() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::INDICATOR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    unsafe { gpio_set_level(pins::INDICATOR_GPIO, 0) };
    info!("hw_init: indicator on GPIO {}", pins::INDICATOR_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_indicator_gpio(). Console thread only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(ADC1_HANDLE, pins::BATTERY_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=battery)", pins::BATTERY_ADC_CHANNEL);
    Ok(())
}

/// Raw 12-bit sample from an ADC1 channel.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    // SAFETY: ADC1_HANDLE is written once during init_adc() before the
    // console starts; only the console thread reads it.
    let handle = unsafe { ADC1_HANDLE };
    if handle.is_null() {
        return Err(SensorError::NotPresent);
    }
    let mut raw: i32 = 0;
    let ret = unsafe { adc_oneshot_read(handle, channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::ReadFailed);
    }
    Ok(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Err(SensorError::NotPresent)
}

// ── On-die temperature sensor ─────────────────────────────────

#[cfg(target_os = "espidf")]
static mut TEMP_HANDLE: temperature_sensor_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_temp_sensor() -> Result<(), HwInitError> {
    let cfg = temperature_sensor_config_t {
        range_min: -10,
        range_max: 80,
        ..Default::default()
    };
    // SAFETY: TEMP_HANDLE is only written here, once at boot.
    let ret = unsafe { temperature_sensor_install(&cfg, &raw mut TEMP_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TempSensorFailed(ret));
    }
    let ret = unsafe { temperature_sensor_enable(TEMP_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TempSensorFailed(ret));
    }
    info!("hw_init: die temperature sensor enabled");
    Ok(())
}

/// Die temperature in degrees Celsius.
#[cfg(target_os = "espidf")]
pub fn die_temperature() -> Result<f32, SensorError> {
    // SAFETY: TEMP_HANDLE is written once in init_temp_sensor(); console
    // thread only.
    let handle = unsafe { TEMP_HANDLE };
    if handle.is_null() {
        return Err(SensorError::NotPresent);
    }
    let mut celsius: f32 = 0.0;
    let ret = unsafe { temperature_sensor_get_celsius(handle, &mut celsius) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::ReadFailed);
    }
    Ok(celsius)
}

#[cfg(not(target_os = "espidf"))]
pub fn die_temperature() -> Result<f32, SensorError> {
    Err(SensorError::NotPresent)
}
