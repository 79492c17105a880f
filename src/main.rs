//! BleConsole firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BluedroidStack      BoardAdapter          MonotonicClock      │
//! │  (NotifyStack)       (System+Indicator)    SystemDelay         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ConsoleService (FSM · registry · chunker)             │    │
//! │  │  ConsoleHandlers (shell · greeting · indicator)        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime: receive loop · poll · auto status                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use bleconsole::adapters::ble_notify::BluedroidStack;
use bleconsole::adapters::hardware::BoardAdapter;
use bleconsole::adapters::time::{MonotonicClock, SystemDelay};
use bleconsole::app::handlers::{ConsoleHandlers, greeting};
use bleconsole::app::runtime;
use bleconsole::app::service::ConsoleService;
use bleconsole::config::SystemConfig;
use bleconsole::drivers::hw_init;
use bleconsole::drivers::indicator::Indicator;
use bleconsole::transport::notify::NotifyTransport;

/// Build-time device profile.
const DEVICE_PROFILE: &str = include_str!("../profiles/device.json");

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BleConsole v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // Bluedroid keeps its bonding and PHY calibration data in NVS.
    // SAFETY: one-shot init before the radio is touched.
    let rc = unsafe { esp_idf_svc::sys::nvs_flash_init() };
    if rc != esp_idf_svc::sys::ESP_OK {
        anyhow::bail!("NVS init failed ({})", rc);
    }

    // ── 2. Device profile ─────────────────────────────────────
    let config = SystemConfig::from_json(DEVICE_PROFILE)?;
    info!(
        "Profile: '{}' adv={}ms mtu={} auto_status={}",
        config.console.device_label,
        config.console.advertising_interval_ms,
        config.preferred_mtu,
        config.auto_status
    );

    // ── 3. Board ──────────────────────────────────────────────
    hw_init::init_peripherals()?;
    let clock = MonotonicClock::new();
    let board = BoardAdapter::new(Indicator::new(), clock);

    // ── 4. Console service ────────────────────────────────────
    let handlers = ConsoleHandlers::new(
        board,
        SystemDelay,
        greeting(&config.console.device_label, "Single Core BLE"),
        config.reset_delay_ms,
    );
    let transport = NotifyTransport::new(BluedroidStack::new(), config.preferred_mtu);
    let mut service = ConsoleService::new(transport, SystemDelay, config.connect_settle_ms);
    service.init(config.console.clone(), handlers)?;

    // ── 5. Run ────────────────────────────────────────────────
    info!("All systems initialized, entering console loop");
    runtime::run(service, clock, &config);
    Ok(())
}
