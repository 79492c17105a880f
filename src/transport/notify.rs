//! Direct-notify transport (single-core topology).
//!
//! The application owns the radio stack and exposes a UART-style console
//! service: peers write console bytes to the RX characteristic and
//! receive replies as notifications on the TX characteristic.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms        |
//! |----------------|----------------------------------------|--------------|
//! | Console RX     | `6e400002-b5a3-f393-e0a9-e50e24dcca9e` | Write        |
//! | Console TX     | `6e400003-b5a3-f393-e0a9-e50e24dcca9e` | Notify       |
//!
//! One notification carries at most `ATT_MTU - 3` bytes; this transport
//! refuses anything larger instead of fragmenting it.

use log::{info, warn};

use super::{DisconnectReason, PeerHandle, Target, Topology, Transport};
use crate::config::ConsoleConfig;
use crate::error::TransportError;

pub const SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_CONSOLE_RX: u128 = 0x6e400002_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_CONSOLE_TX: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;

/// ATT notification header (opcode + attribute handle).
const ATT_NOTIFY_HEADER: usize = 3;
/// Minimum ATT MTU every peer supports.
pub const DEFAULT_ATT_MTU: u16 = 23;

/// The radio stack primitives the console needs.
pub trait NotifyStack {
    /// Power up the controller and host. Completion is reported later
    /// as [`TransportEvent::Bound`](super::TransportEvent::Bound).
    fn enable(&mut self, config: &ConsoleConfig, preferred_mtu: u16) -> Result<(), TransportError>;

    /// Register the console GATT service.
    fn register_console_service(&mut self) -> Result<(), TransportError>;

    fn start_advertising(&mut self, config: &ConsoleConfig) -> Result<(), TransportError>;

    fn stop_advertising(&mut self) -> Result<(), TransportError>;

    /// Notify one peer, or every subscribed peer for [`Target::Broadcast`].
    fn notify(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError>;

    fn disconnect(&mut self, peer: PeerHandle, reason: DisconnectReason)
    -> Result<(), TransportError>;

    /// Current ATT MTU (smallest negotiated across peers).
    fn mtu(&self) -> u16;
}

pub struct NotifyTransport<S: NotifyStack> {
    stack: S,
    preferred_mtu: u16,
    config: Option<ConsoleConfig>,
    service_enabled: bool,
    ready: bool,
}

impl<S: NotifyStack> NotifyTransport<S> {
    pub fn new(stack: S, preferred_mtu: u16) -> Self {
        Self {
            stack,
            preferred_mtu,
            config: None,
            service_enabled: false,
            ready: false,
        }
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }
}

impl<S: NotifyStack> Transport for NotifyTransport<S> {
    fn topology(&self) -> Topology {
        Topology::SingleCore
    }

    fn open(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        self.stack.enable(config, self.preferred_mtu)?;
        if config.enable_console_service {
            self.stack.register_console_service()?;
            self.service_enabled = true;
        } else {
            info!("NOTIFY: console service disabled by config");
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn on_bound(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        self.ready = true;
        self.stack.start_advertising(config)?;
        info!(
            "NOTIFY: advertising '{}' every {} ms",
            config.device_label, config.advertising_interval_ms
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn capacity(&self) -> usize {
        (self.stack.mtu() as usize).saturating_sub(ATT_NOTIFY_HEADER)
    }

    fn send(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError> {
        if !self.service_enabled {
            return Err(TransportError::NotSupported);
        }
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        if data.is_empty() || data.len() > self.capacity() {
            warn!(
                "NOTIFY: {} bytes outside notify bounds (max {})",
                data.len(),
                self.capacity()
            );
            return Err(TransportError::InvalidArgument);
        }
        self.stack.notify(target, data)
    }

    fn start_advertising(&mut self) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        let config = self.config.as_ref().ok_or(TransportError::NotReady)?;
        self.stack.start_advertising(config)
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        self.stack.stop_advertising()
    }

    fn disconnect(
        &mut self,
        peer: PeerHandle,
        reason: DisconnectReason,
    ) -> Result<(), TransportError> {
        self.stack.disconnect(peer, reason)
    }
}
