//! Console service: the hexagonal core.
//!
//! [`ConsoleService`] owns the transport, the connection state machine,
//! the peer registry and the registered [`LinkEvents`] handlers. Every
//! transport event enters through [`handle_event`](ConsoleService::handle_event)
//! and every timed continuation through [`poll`](ConsoleService::poll);
//! both run on the console thread, so nothing here needs a lock.
//!
//! ```text
//!  TransportEvent ──▶ ┌──────────────────────────┐ ──▶ LinkEvents
//!                     │      ConsoleService      │
//!     Transport  ◀────│  LinkFsm · Registry      │◀── Link (send)
//!                     └──────────────────────────┘
//! ```
//!
//! The service is split in two halves: [`LinkCore`] (transport, FSM,
//! registry) and the handler slot. Handlers receive `&mut LinkCore` as
//! their [`Link`], which lets them send replies while the service is in
//! the middle of dispatching an event.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::config::ConsoleConfig;
use crate::error::{InitError, SendError, TransportError};
use crate::fsm::{ConnectionState, Effect, LinkFsm, LinkInput};
use crate::transport::chunked::send_chunked;
use crate::transport::registry::{ConnectionRegistry, MAX_PEERS};
use crate::transport::{DisconnectReason, PeerHandle, Target, Topology, Transport, TransportEvent};

use super::events::{Link, LinkEvents};

// ───────────────────────────────────────────────────────────────
// LinkCore
// ───────────────────────────────────────────────────────────────

/// Transport-facing half of the service.
pub struct LinkCore<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    fsm: LinkFsm,
    registry: ConnectionRegistry,
    initialized: bool,
    /// Logical sends finished since the last `data_sent` flush.
    completed_sends: u32,
}

impl<T: Transport, D: DelayNs> LinkCore<T, D> {
    fn logical_send(&mut self, target: Target, data: &[u8]) -> Result<(), SendError> {
        if !self.initialized {
            return Err(SendError::NotInitialized);
        }
        if data.is_empty() {
            return Err(SendError::InvalidArgument);
        }
        if let Target::Peer(peer) = target {
            if self.transport.topology() == Topology::SingleCore && !self.registry.contains(peer) {
                return Err(SendError::NotConnected);
            }
        }
        send_chunked(&mut self.transport, &mut self.delay, target, data)?;
        self.completed_sends += 1;
        Ok(())
    }
}

impl<T: Transport, D: DelayNs> Link for LinkCore<T, D> {
    fn send(&mut self, target: Target, data: &[u8]) -> Result<(), SendError> {
        self.logical_send(target, data)
    }

    fn state(&self) -> ConnectionState {
        self.fsm.current_state()
    }

    fn connection_count(&self) -> usize {
        match self.transport.topology() {
            Topology::SingleCore => self.registry.count(),
            Topology::DualCore => usize::from(self.state() == ConnectionState::Connected),
        }
    }

    fn probe(&mut self) -> Result<(), SendError> {
        if !self.initialized {
            return Err(SendError::NotInitialized);
        }
        self.transport.probe()?;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ConsoleService
// ───────────────────────────────────────────────────────────────

pub struct ConsoleService<T: Transport, D: DelayNs, H: LinkEvents> {
    core: LinkCore<T, D>,
    handlers: Option<H>,
    config: Option<ConsoleConfig>,
    /// Delay between link-up and the `connected` callback.
    settle_ms: u32,
    /// Deadline of the pending `connected` callback.
    connected_due: Option<u64>,
    /// `connected` ran for the current session; `disconnected` is owed.
    connected_fired: bool,
    /// Timestamp of the event or poll being processed.
    now_ms: u64,
}

impl<T: Transport, D: DelayNs, H: LinkEvents> ConsoleService<T, D, H> {
    /// Construct the service. Nothing happens on the transport until
    /// [`init`](Self::init).
    pub fn new(transport: T, delay: D, settle_ms: u32) -> Self {
        let initial = match transport.topology() {
            Topology::SingleCore => ConnectionState::Disconnected,
            Topology::DualCore => ConnectionState::TransportError,
        };
        Self {
            core: LinkCore {
                transport,
                delay,
                fsm: LinkFsm::new(initial),
                registry: ConnectionRegistry::new(),
                initialized: false,
                completed_sends: 0,
            },
            handlers: None,
            config: None,
            settle_ms,
            connected_due: None,
            connected_fired: false,
            now_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate `config`, open the transport and register `handlers`.
    ///
    /// Bring-up finishes when the transport reports `Bound`.
    pub fn init(&mut self, config: ConsoleConfig, handlers: H) -> Result<(), InitError> {
        if self.core.initialized {
            warn!("LINK: already initialized");
            return Err(InitError::AlreadyInitialized);
        }
        config.validate()?;
        if let Err(e) = self.core.transport.open(&config) {
            error!("LINK: transport setup failed: {}", e);
            return Err(InitError::TransportSetupFailed);
        }

        info!(
            "LINK: initialized as '{}' ({:?})",
            config.device_label,
            self.core.transport.topology()
        );
        self.core.initialized = true;
        self.handlers = Some(handlers);
        self.config = Some(config);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.core.initialized
    }

    // ── Outbound API ──────────────────────────────────────────

    /// One logical send; fires `data_sent` once on success.
    pub fn send(&mut self, target: Target, data: &[u8]) -> Result<(), SendError> {
        let result = self.core.logical_send(target, data);
        self.flush_sent();
        result
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.core.state()
    }

    pub fn connection_count(&self) -> usize {
        self.core.connection_count()
    }

    pub fn probe(&mut self) -> Result<(), SendError> {
        self.core.probe()
    }

    pub fn start_advertising(&mut self) -> Result<(), SendError> {
        if !self.core.initialized {
            return Err(SendError::NotInitialized);
        }
        self.core.transport.start_advertising()?;
        self.apply(LinkInput::AdvertisingStarted);
        Ok(())
    }

    pub fn stop_advertising(&mut self) -> Result<(), SendError> {
        if !self.core.initialized {
            return Err(SendError::NotInitialized);
        }
        self.core.transport.stop_advertising()?;
        self.apply(LinkInput::AdvertisingStopped);
        Ok(())
    }

    /// Ask the stack to drop one peer. The matching `PeerDisconnected`
    /// event arrives later.
    pub fn disconnect(&mut self, peer: PeerHandle) -> Result<(), SendError> {
        if !self.core.initialized {
            return Err(SendError::NotInitialized);
        }
        if !self.core.registry.contains(peer) {
            return Err(SendError::NotConnected);
        }
        self.core
            .transport
            .disconnect(peer, DisconnectReason::LOCAL_HOST_TERMINATED)?;
        Ok(())
    }

    /// Drop every peer. Keeps going past failures and returns the first.
    pub fn disconnect_all(&mut self) -> Result<(), SendError> {
        if !self.core.initialized {
            return Err(SendError::NotInitialized);
        }
        let peers: Vec<PeerHandle, MAX_PEERS> = self.core.registry.iter().collect();
        let mut first_err = None;
        for peer in peers {
            if let Err(e) = self
                .core
                .transport
                .disconnect(peer, DisconnectReason::LOCAL_HOST_TERMINATED)
            {
                warn!("LINK: disconnect of peer {} failed: {}", peer, e);
                first_err.get_or_insert(SendError::from(e));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    // ── Inbound dispatch ──────────────────────────────────────

    pub fn handle_event(&mut self, event: TransportEvent<'_>, now_ms: u64) {
        self.now_ms = now_ms;
        match event {
            TransportEvent::Bound => self.complete_bring_up(),
            TransportEvent::Unbound => {
                warn!("LINK: transport endpoint lost");
                self.core.transport.on_unbound();
                self.core.registry.clear();
                self.apply(LinkInput::EndpointLost);
            }
            TransportEvent::PeerConnected(peer) => {
                self.core.registry.add(peer);
                info!(
                    "LINK: peer {} connected ({} total)",
                    peer,
                    self.core.registry.count()
                );
                self.apply(LinkInput::PeerLinked);
            }
            TransportEvent::PeerDisconnected { peer, reason } => {
                if !self.core.registry.remove(peer) {
                    debug!("LINK: disconnect for unknown peer {}", peer);
                }
                info!("LINK: peer {} disconnected (reason 0x{:02x})", peer, reason.0);
                if self.core.registry.is_empty() {
                    self.apply(LinkInput::LastPeerLost(reason));
                }
            }
            TransportEvent::AdvertisingStopped => self.apply(LinkInput::AdvertisingStopped),
            TransportEvent::StateSync(reported) => self.sync_state(reported),
            TransportEvent::Received { source, data } => {
                info!("RX: {} bytes", data.len());
                debug!("RX: {:02x?}", data);
                if let Some(handlers) = self.handlers.as_mut() {
                    handlers.data_received(source, data, &mut self.core);
                }
            }
            TransportEvent::SubscriptionChanged { peer, enabled } => {
                info!(
                    "LINK: peer {} notifications {}",
                    peer,
                    if enabled { "on" } else { "off" }
                );
                if let Some(handlers) = self.handlers.as_mut() {
                    handlers.send_enabled(enabled);
                }
            }
            TransportEvent::ProbeReply(data) => {
                info!(
                    "LINK: probe reply: {}",
                    core::str::from_utf8(data).unwrap_or("<binary>")
                );
            }
        }
        self.flush_sent();
        if let Some(handlers) = self.handlers.as_mut() {
            handlers.idle();
        }
    }

    /// Run timed continuations that are due at `now_ms`.
    pub fn poll(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        match self.connected_due {
            Some(due) if now_ms >= due => {
                self.connected_due = None;
                self.fire_connected();
            }
            _ => {}
        }
    }

    /// `true` while a `connected` callback waits for its settle delay.
    pub fn connected_pending(&self) -> bool {
        self.connected_due.is_some()
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn handlers_mut(&mut self) -> Option<&mut H> {
        self.handlers.as_mut()
    }

    pub fn transport(&self) -> &T {
        &self.core.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.core.transport
    }

    // ── Internal ──────────────────────────────────────────────

    fn complete_bring_up(&mut self) {
        let Some(config) = self.config.as_ref() else {
            warn!("LINK: bound before init, ignoring");
            return;
        };
        if let Err(e) = self.core.transport.on_bound(config) {
            error!("LINK: bring-up failed: {}", e);
            if self.core.transport.is_ready() {
                self.apply(LinkInput::EndpointBound);
            }
            return;
        }
        if self.core.fsm.apply(LinkInput::Bound).is_none() {
            debug!("LINK: duplicate bound");
            return;
        }
        self.run_effects();
        if let Some(handlers) = self.handlers.as_mut() {
            handlers.ready(&mut self.core);
        }
    }

    /// Map a companion state report onto state machine edges.
    fn sync_state(&mut self, reported: ConnectionState) {
        if self.core.transport.topology() == Topology::SingleCore {
            warn!("LINK: state report on single-core link ignored");
            return;
        }
        if !self.core.transport.is_ready() {
            warn!("LINK: state report while endpoint unbound ignored");
            return;
        }
        let current = self.connection_state();
        debug!("LINK: companion reports {}", reported.name());
        match reported {
            ConnectionState::Connected => self.apply(LinkInput::PeerLinked),
            ConnectionState::Disconnected => {
                if current == ConnectionState::Connected {
                    self.apply(LinkInput::LastPeerLost(DisconnectReason::UNKNOWN));
                } else {
                    self.apply(LinkInput::AdvertisingStopped);
                }
            }
            ConnectionState::Advertising => {
                if current == ConnectionState::Connected {
                    self.apply(LinkInput::LastPeerLost(DisconnectReason::UNKNOWN));
                }
                self.apply(LinkInput::AdvertisingStarted);
            }
            ConnectionState::TransportError => {}
        }
    }

    fn apply(&mut self, input: LinkInput) {
        if self.core.fsm.apply(input).is_some() {
            self.run_effects();
        }
    }

    fn run_effects(&mut self) {
        for effect in self.core.fsm.take_effects() {
            match effect {
                Effect::ScheduleConnected => {
                    self.connected_due = Some(self.now_ms + u64::from(self.settle_ms));
                    if self.settle_ms == 0 {
                        self.connected_due = None;
                        self.fire_connected();
                    }
                }
                Effect::CancelConnected => {
                    if self.connected_due.take().is_some() {
                        debug!("LINK: pending connected callback dropped");
                    }
                }
                Effect::NotifyDisconnected(reason) => {
                    if !core::mem::take(&mut self.connected_fired) {
                        debug!("LINK: session ended before connected, no disconnect callback");
                        continue;
                    }
                    if let Some(handlers) = self.handlers.as_mut() {
                        handlers.disconnected(reason);
                    }
                }
                Effect::RearmAdvertising => match self.core.transport.start_advertising() {
                    Ok(()) => self.apply(LinkInput::AdvertisingStarted),
                    Err(TransportError::NotSupported) => {
                        debug!("LINK: advertising is managed by the companion");
                    }
                    Err(e) => error!("LINK: re-advertising failed: {}", e),
                },
            }
        }
    }

    fn fire_connected(&mut self) {
        if self.core.state() != ConnectionState::Connected {
            return;
        }
        self.connected_fired = true;
        if let Some(handlers) = self.handlers.as_mut() {
            handlers.connected(&mut self.core);
        }
        self.flush_sent();
    }

    fn flush_sent(&mut self) {
        let completed = core::mem::take(&mut self.core.completed_sends);
        if let Some(handlers) = self.handlers.as_mut() {
            for _ in 0..completed {
                handlers.data_sent();
            }
        }
    }
}
