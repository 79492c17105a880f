//! Inter-core transport (dual-core topology).
//!
//! The companion core owns the radio. This side registers an endpoint on
//! the shared channel, waits for it to bind, then sends an `Init` frame
//! carrying the device label. After that, console text travels as
//! `SendData` frames and the companion reports link changes with
//! `ConnectionState` frames.
//!
//! ```text
//!  app core                                 companion core
//!  ────────                                 ──────────────
//!  register ─────────────────────────────▶
//!           ◀──────────────────────────── bound
//!  Init(label) ──────────────────────────▶  start advertising
//!           ◀──────────────────────────── ConnectionState(1)
//!  SendData(≤120 B) ─────────────────────▶  notify peer
//!           ◀──────────────────────────── DataReceived(bytes)
//! ```

use log::{debug, info, warn};

use super::message::{FRAME_LEN, MAX_PAYLOAD, MessageType, TransportMessage};
use super::{Target, Topology, Transport, TransportEvent};
use crate::config::ConsoleConfig;
use crate::error::TransportError;

/// Bytes of console text per `SendData` frame.
pub const IPC_CHUNK: usize = 120;
/// Pause between `SendData` frames of one logical send.
pub const IPC_FRAGMENT_PAUSE_MS: u32 = 10;
/// Payload of the link probe.
pub const PROBE_TEXT: &[u8] = b"IPC Test from App Core";

/// The raw shared-memory endpoint. The board crate supplies the
/// implementation for its inter-core mailbox.
pub trait IpcEndpoint {
    /// Register with the inter-core service. Binding completes later and
    /// is reported as [`TransportEvent::Bound`].
    fn register(&mut self) -> Result<(), TransportError>;

    /// Push one encoded frame to the companion.
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), TransportError>;
}

pub struct IpcTransport<E: IpcEndpoint> {
    endpoint: E,
    bound: bool,
}

impl<E: IpcEndpoint> IpcTransport<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            bound: false,
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut E {
        &mut self.endpoint
    }

    fn send_message(&mut self, kind: MessageType, payload: &[u8]) -> Result<(), TransportError> {
        if !self.bound {
            warn!("IPC: endpoint not bound");
            return Err(TransportError::NotConnected);
        }
        let Some(msg) = TransportMessage::new(kind, payload) else {
            warn!("IPC: {} bytes exceed one frame", payload.len());
            return Err(TransportError::InvalidArgument);
        };
        self.endpoint.send_frame(&msg.encode())?;
        debug!("IPC: sent {:?} ({} bytes)", kind, payload.len());
        Ok(())
    }
}

impl<E: IpcEndpoint> Transport for IpcTransport<E> {
    fn topology(&self) -> Topology {
        Topology::DualCore
    }

    fn open(&mut self, _config: &ConsoleConfig) -> Result<(), TransportError> {
        self.endpoint.register()?;
        info!("IPC: endpoint registered, waiting for companion");
        Ok(())
    }

    fn on_bound(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        self.bound = true;
        self.send_message(MessageType::Init, config.device_label.as_bytes())?;
        info!("IPC: init sent ('{}')", config.device_label);
        Ok(())
    }

    fn on_unbound(&mut self) {
        self.bound = false;
    }

    fn is_ready(&self) -> bool {
        self.bound
    }

    fn capacity(&self) -> usize {
        IPC_CHUNK
    }

    fn fragment_pause_ms(&self) -> u32 {
        IPC_FRAGMENT_PAUSE_MS
    }

    /// The companion routes to its own peer, so `target` is not encoded.
    fn send(&mut self, _target: Target, data: &[u8]) -> Result<(), TransportError> {
        if data.len() > MAX_PAYLOAD {
            return Err(TransportError::InvalidArgument);
        }
        self.send_message(MessageType::SendData, data)
    }

    fn probe(&mut self) -> Result<(), TransportError> {
        self.send_message(MessageType::Test, PROBE_TEXT)
    }
}

/// Translate a decoded inbound frame into a transport event. Frames the
/// companion should never send are logged and dropped.
pub fn frame_event(msg: &TransportMessage) -> Option<TransportEvent<'_>> {
    match msg.kind {
        MessageType::ConnectionState => match msg.reported_state() {
            Ok(state) => Some(TransportEvent::StateSync(state)),
            Err(e) => {
                warn!("IPC: bad state frame: {}", e);
                None
            }
        },
        MessageType::DataReceived => Some(TransportEvent::Received {
            source: None,
            data: &msg.payload,
        }),
        MessageType::Test => Some(TransportEvent::ProbeReply(&msg.payload)),
        MessageType::Init | MessageType::SendData => {
            warn!("IPC: unexpected inbound {:?}", msg.kind);
            None
        }
    }
}
