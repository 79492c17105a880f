//! Periodic `[AUTO]` status line.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::error::SendError;
use crate::fsm::ConnectionState;
use crate::transport::{Target, Transport};

use super::handlers::ConsoleHandlers;
use super::ports::{Platform, SystemPort};
use super::service::ConsoleService;

pub const STATUS_CAPACITY: usize = 96;

pub type StatusLine = heapless::String<STATUS_CAPACITY>;

/// `[AUTO] Uptime: S.mmms | Battery: P% (VmV) | Temp: T°C`; readings that
/// fail are left out.
pub fn auto_status_line<S: SystemPort + ?Sized>(system: &mut S) -> StatusLine {
    let mut line = StatusLine::new();
    let uptime = system.uptime_ms();
    let _ = write!(line, "[AUTO] Uptime: {}.{:03}s", uptime / 1000, uptime % 1000);
    if let Ok(battery) = system.battery_status() {
        let _ = write!(
            line,
            " | Battery: {}% ({}mV)",
            battery.percentage, battery.voltage_mv
        );
    }
    if let Ok(celsius) = system.temperature_celsius() {
        let _ = write!(line, " | Temp: {}°C", celsius);
    }
    let _ = line.push('\n');
    line
}

/// Broadcast one status line if a peer is connected.
///
/// Returns `Ok(false)` when there was nobody to send to.
pub fn publish_status<T, D, P, HD>(
    service: &mut ConsoleService<T, D, ConsoleHandlers<P, HD>>,
) -> Result<bool, SendError>
where
    T: Transport,
    D: DelayNs,
    P: Platform,
    HD: DelayNs,
{
    if service.connection_state() != ConnectionState::Connected {
        return Ok(false);
    }
    let Some(handlers) = service.handlers_mut() else {
        return Ok(false);
    };
    let line = handlers.status_line();
    match service.send(Target::Broadcast, line.as_bytes()) {
        Ok(()) => {
            debug!("STATUS: sent auto status");
            Ok(true)
        }
        Err(e) => {
            warn!("STATUS: auto status not sent: {}", e);
            Err(e)
        }
    }
}
