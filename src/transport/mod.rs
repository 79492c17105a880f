//! Transport abstraction: a message-oriented channel to the peer.
//!
//! Concrete implementations:
//! - [`notify::NotifyTransport`]: the application owns the radio stack and
//!   pushes text through a notify-capable console service (single-core).
//! - [`ipc::IpcTransport`]: the application talks to a companion core
//!   over a framed inter-core endpoint; the companion runs the radio
//!   (dual-core).
//!
//! The console service is generic over [`Transport`], so the command
//! engine and state machine do not care which topology is in use.
//!
//! Every transport has a bounded per-message [`capacity`](Transport::capacity);
//! larger logical sends are split by [`chunked::send_chunked`].

pub mod channels;
pub mod chunked;
pub mod ipc;
pub mod message;
pub mod notify;
pub mod registry;

use crate::config::ConsoleConfig;
use crate::error::TransportError;
use crate::fsm::ConnectionState;

/// Stack-assigned handle of one linked peer.
pub type PeerHandle = u16;

/// Where a send goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Peer(PeerHandle),
    /// Every subscribed peer (or the companion's current peer).
    Broadcast,
}

/// HCI-style disconnect reason code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisconnectReason(pub u8);

impl DisconnectReason {
    /// The inter-core link does not carry a reason.
    pub const UNKNOWN: Self = Self(0x00);
    pub const REMOTE_USER_TERMINATED: Self = Self(0x13);
    pub const LOCAL_HOST_TERMINATED: Self = Self(0x16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Radio stack on the application core.
    SingleCore,
    /// Radio stack on a companion core behind an inter-core endpoint.
    DualCore,
}

/// Events a transport delivers to its single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// Stack bring-up finished / inter-core endpoint bound.
    Bound,
    /// Inter-core endpoint lost.
    Unbound,
    PeerConnected(PeerHandle),
    PeerDisconnected {
        peer: PeerHandle,
        reason: DisconnectReason,
    },
    /// Advertising ended on its own (timeout, stack stop).
    AdvertisingStopped,
    /// Companion-reported state (dual-core).
    StateSync(ConnectionState),
    /// Console bytes from a peer. `source` is `None` on the inter-core
    /// link, which does not identify the peer.
    Received {
        source: Option<PeerHandle>,
        data: &'a [u8],
    },
    /// A peer toggled notifications on the console characteristic.
    SubscriptionChanged {
        peer: PeerHandle,
        enabled: bool,
    },
    /// Companion answered a link probe.
    ProbeReply(&'a [u8]),
}

/// Message-oriented transport channel.
pub trait Transport {
    fn topology(&self) -> Topology;

    /// Bring the transport up. Bring-up completes asynchronously with a
    /// [`TransportEvent::Bound`].
    fn open(&mut self, config: &ConsoleConfig) -> Result<(), TransportError>;

    /// Finish bring-up after `Bound`: start advertising, or perform the
    /// inter-core handshake.
    fn on_bound(&mut self, config: &ConsoleConfig) -> Result<(), TransportError>;

    /// The inter-core endpoint went away.
    fn on_unbound(&mut self) {}

    fn is_ready(&self) -> bool;

    /// Largest payload one [`send`](Self::send) accepts.
    fn capacity(&self) -> usize;

    /// Pause between consecutive fragments of one logical send.
    fn fragment_pause_ms(&self) -> u32 {
        0
    }

    /// Send one message of at most [`capacity`](Self::capacity) bytes.
    fn send(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError>;

    /// Start advertising. `NotSupported` means the companion owns it.
    fn start_advertising(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }

    fn disconnect(
        &mut self,
        _peer: PeerHandle,
        _reason: DisconnectReason,
    ) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }

    /// Send a liveness probe to the far side.
    fn probe(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }
}
