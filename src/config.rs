//! System configuration parameters
//!
//! All tunable parameters for the console firmware. The device binary
//! parses them from the JSON device profile baked in at build time;
//! anything the profile omits falls back to [`Default`].

use serde::{Deserialize, Serialize};

use crate::adapters::utils::is_printable_ascii;
use crate::error::InitError;

/// Longest device label the advertising payload can carry.
pub const MAX_LABEL_LEN: usize = 29;

/// Advertising interval bounds accepted by the radio (milliseconds).
pub const MIN_ADV_INTERVAL_MS: u16 = 20;
pub const MAX_ADV_INTERVAL_MS: u16 = 10_240;

pub const DEFAULT_LABEL: &str = "BleConsole";

/// Link-level settings handed to [`ConsoleService::init`](crate::app::service::ConsoleService::init).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Name advertised to peers (1-29 printable ASCII bytes).
    pub device_label: heapless::String<MAX_LABEL_LEN>,
    /// Advertising interval in milliseconds (20-10240).
    pub advertising_interval_ms: u16,
    /// Advertise as connectable.
    pub connectable: bool,
    /// Register the notify-capable console service.
    pub enable_console_service: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let mut device_label = heapless::String::new();
        let _ = device_label.push_str(DEFAULT_LABEL);
        Self {
            device_label,
            advertising_interval_ms: 100,
            connectable: true,
            enable_console_service: true,
        }
    }
}

impl ConsoleConfig {
    /// Reject labels and intervals the radio would refuse.
    pub fn validate(&self) -> Result<(), InitError> {
        let label = self.device_label.as_str();
        if label.is_empty() || !is_printable_ascii(label) {
            return Err(InitError::InvalidConfig);
        }
        if !(MIN_ADV_INTERVAL_MS..=MAX_ADV_INTERVAL_MS).contains(&self.advertising_interval_ms) {
            return Err(InitError::InvalidConfig);
        }
        Ok(())
    }

    /// Advertising interval in 0.625 ms radio units.
    pub fn advertising_interval_units(&self) -> u16 {
        (u32::from(self.advertising_interval_ms) * 8 / 5) as u16
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Link ---
    pub console: ConsoleConfig,
    /// Local ATT MTU requested from peers (notify topology only).
    pub preferred_mtu: u16,

    // --- Console behaviour ---
    /// Send the periodic `[AUTO]` status line while connected.
    pub auto_status: bool,
    /// Period of the auto-status line (seconds)
    pub status_interval_secs: u32,
    /// Delay between link-up and the `connected` callback (milliseconds)
    pub connect_settle_ms: u32,
    /// Pause between the reset acknowledgement and the reboot (milliseconds)
    pub reset_delay_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig::default(),
            preferred_mtu: 247,

            auto_status: true,
            status_interval_secs: 10,
            connect_settle_ms: 1000,
            reset_delay_ms: 100,
        }
    }
}

impl SystemConfig {
    /// Parse a JSON device profile. Missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, InitError> {
        let config: Self = serde_json::from_str(raw).map_err(|_| InitError::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InitError> {
        self.console.validate()?;
        if self.status_interval_secs == 0 || self.preferred_mtu < 23 {
            return Err(InitError::InvalidConfig);
        }
        Ok(())
    }
}
