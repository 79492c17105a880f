//! Inbound transport channel.
//!
//! Radio-stack and inter-core callbacks run in foreign contexts (the
//! Bluedroid task, the IPC work queue). They never touch the console
//! directly: each callback copies its data into an owned [`Inbound`]
//! and posts it here. The console task drains the channel and replays
//! every item as a borrowed [`TransportEvent`], so all state changes
//! happen on one thread.
//!
//! ```text
//! ┌───────────────┐  Inbound  ┌────────────────┐
//! │ stack / IPC   │──────────▶│ console task   │
//! │ callbacks     │  (bounded)│ ConsoleService │
//! └───────────────┘           └────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

use super::ipc::frame_event;
use super::message::{FRAME_LEN, TransportMessage};
use super::{DisconnectReason, PeerHandle, TransportEvent};

/// Largest console write accepted from one peer in one go.
pub const RX_CHUNK: usize = 256;

/// Channel depth for inbound items.
const INBOUND_DEPTH: usize = 16;

/// Owned copy of a transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Bound,
    Unbound,
    PeerConnected(PeerHandle),
    PeerDisconnected {
        peer: PeerHandle,
        reason: DisconnectReason,
    },
    AdvertisingStopped,
    /// Raw inter-core frame, decoded on the console thread.
    Frame(Vec<u8, FRAME_LEN>),
    Received {
        source: Option<PeerHandle>,
        data: Vec<u8, RX_CHUNK>,
    },
    SubscriptionChanged {
        peer: PeerHandle,
        enabled: bool,
    },
}

impl Inbound {
    /// Copy a received console write. Bytes beyond [`RX_CHUNK`] are dropped.
    pub fn received(source: Option<PeerHandle>, data: &[u8]) -> Self {
        let take = data.len().min(RX_CHUNK);
        if take < data.len() {
            warn!("RX: write of {} bytes truncated to {}", data.len(), RX_CHUNK);
        }
        let mut buf = Vec::new();
        let _ = buf.extend_from_slice(&data[..take]);
        Self::Received { source, data: buf }
    }

    /// Copy an inter-core frame. Anything past one frame is ignored.
    pub fn frame(raw: &[u8]) -> Self {
        let mut buf = Vec::new();
        let _ = buf.extend_from_slice(&raw[..raw.len().min(FRAME_LEN)]);
        Self::Frame(buf)
    }

    /// Replay as a borrowed event. Returns `None` for frames that do not
    /// decode into an event.
    pub fn with_event<R>(&self, f: impl FnOnce(TransportEvent<'_>) -> R) -> Option<R> {
        let event = match self {
            Self::Bound => TransportEvent::Bound,
            Self::Unbound => TransportEvent::Unbound,
            Self::PeerConnected(peer) => TransportEvent::PeerConnected(*peer),
            Self::PeerDisconnected { peer, reason } => TransportEvent::PeerDisconnected {
                peer: *peer,
                reason: *reason,
            },
            Self::AdvertisingStopped => TransportEvent::AdvertisingStopped,
            Self::Received { source, data } => TransportEvent::Received {
                source: *source,
                data,
            },
            Self::SubscriptionChanged { peer, enabled } => TransportEvent::SubscriptionChanged {
                peer: *peer,
                enabled: *enabled,
            },
            Self::Frame(raw) => {
                let msg = match TransportMessage::decode(raw) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("IPC: dropping frame: {}", e);
                        return None;
                    }
                };
                return frame_event(&msg).map(f);
            }
        };
        Some(f(event))
    }
}

/// Inbound channel: stack callbacks → console task.
pub static INBOUND: Channel<CriticalSectionRawMutex, Inbound, INBOUND_DEPTH> = Channel::new();

/// Post from a callback context. Drops (and logs) when the console task
/// has fallen behind.
pub fn post(item: Inbound) -> bool {
    if INBOUND.try_send(item).is_err() {
        warn!("RX: inbound channel full, dropping event");
        return false;
    }
    true
}

/// Non-blocking receive for polling loops and tests.
pub fn try_recv() -> Option<Inbound> {
    INBOUND.try_receive().ok()
}
