//! Function-pointer connection state machine.
//!
//! ```text
//!                 Bound / AdvertisingStarted
//!  ┌──────────────┐ ───────────────────────▶ ┌─────────────┐
//!  │ Disconnected │                          │ Advertising │
//!  └──────────────┘ ◀─────────────────────── └─────────────┘
//!     ▲      │        AdvertisingStopped            │
//!     │      │ PeerLinked                PeerLinked │
//!     │      ▼                                      ▼
//!     │   ┌───────────────────────────────────────────┐
//!     └───│                 Connected                 │
//!  LastPeerLost └───────────────────────────────────────────┘
//!
//!  any ── EndpointLost ──▶ TransportError ── Bound ──▶ Advertising
//!                          TransportError ── EndpointBound ──▶ Disconnected
//! ```
//!
//! The table holds one [`StateDescriptor`] per state. A transition runs
//! `on_exit` of the old state, then `on_enter` of the new one; both push
//! [`Effect`]s into the [`LinkContext`] instead of acting directly, so
//! the owning service decides how to carry them out. Inputs that do not
//! name an edge from the current state, including a repeat of the input
//! that produced it, leave the machine untouched.

use heapless::Vec;
use log::{debug, info};

use crate::transport::DisconnectReason;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Advertising = 1,
    Connected = 2,
    /// Dual-core only: the inter-core endpoint is unbound.
    TransportError = 3,
}

impl ConnectionState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::Advertising,
            2 => Self::Connected,
            3 => Self::TransportError,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::TransportError
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Advertising => "Advertising",
            Self::Connected => "Connected",
            Self::TransportError => "TransportError",
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs and effects
// ---------------------------------------------------------------------------

/// Everything that can move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInput {
    /// Transport finished bring-up (stack ready or endpoint handshake done).
    Bound,
    /// The endpoint bound but the rest of bring-up failed.
    EndpointBound,
    /// The inter-core endpoint went away.
    EndpointLost,
    /// Advertising was (re)started.
    AdvertisingStarted,
    /// Advertising ended without a connection.
    AdvertisingStopped,
    /// First peer linked.
    PeerLinked,
    /// The last peer dropped.
    LastPeerLost(DisconnectReason),
}

/// Side effects requested by entry and exit actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Arm the deferred `connected` callback.
    ScheduleConnected,
    /// Drop a `connected` callback that has not fired yet.
    CancelConnected,
    /// Fire `disconnected(reason)`.
    NotifyDisconnected(DisconnectReason),
    /// Restart advertising after the last peer left.
    RearmAdvertising,
}

const MAX_EFFECTS: usize = 4;

/// Mutable state threaded through every entry/exit action.
#[derive(Debug, Default)]
pub struct LinkContext {
    /// State being left during the current transition.
    pub previous: Option<ConnectionState>,
    /// Reason carried by the input that caused the current transition.
    pub reason: DisconnectReason,
    effects: Vec<Effect, MAX_EFFECTS>,
}

impl LinkContext {
    pub fn push(&mut self, effect: Effect) {
        if self.effects.push(effect).is_err() {
            debug_assert!(false, "effect queue overflow");
        }
    }

    /// Drain effects in the order the actions produced them.
    pub fn take_effects(&mut self) -> Vec<Effect, MAX_EFFECTS> {
        core::mem::take(&mut self.effects)
    }
}

/// The edge function. `None` means "no transition".
pub fn next_state(current: ConnectionState, input: LinkInput) -> Option<ConnectionState> {
    use ConnectionState::{Advertising, Connected, Disconnected, TransportError};

    match (current, input) {
        (Disconnected | TransportError, LinkInput::Bound) => Some(Advertising),
        (TransportError, LinkInput::EndpointBound) => Some(Disconnected),
        (Disconnected, LinkInput::AdvertisingStarted) => Some(Advertising),
        (Advertising, LinkInput::AdvertisingStopped) => Some(Disconnected),
        (Disconnected | Advertising, LinkInput::PeerLinked) => Some(Connected),
        (Connected, LinkInput::LastPeerLost(_)) => Some(Disconnected),
        (Disconnected | Advertising | Connected, LinkInput::EndpointLost) => Some(TransportError),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub type StateActionFn = fn(&mut LinkContext);

pub struct StateDescriptor {
    pub id: ConnectionState,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
}

fn enter_connected(ctx: &mut LinkContext) {
    ctx.push(Effect::ScheduleConnected);
}

fn exit_connected(ctx: &mut LinkContext) {
    ctx.push(Effect::CancelConnected);
    ctx.push(Effect::NotifyDisconnected(ctx.reason));
}

fn enter_disconnected(ctx: &mut LinkContext) {
    if ctx.previous == Some(ConnectionState::Connected) {
        ctx.push(Effect::RearmAdvertising);
    }
}

pub fn build_state_table() -> [StateDescriptor; ConnectionState::COUNT] {
    [
        StateDescriptor {
            id: ConnectionState::Disconnected,
            on_enter: Some(enter_disconnected),
            on_exit: None,
        },
        StateDescriptor {
            id: ConnectionState::Advertising,
            on_enter: None,
            on_exit: None,
        },
        StateDescriptor {
            id: ConnectionState::Connected,
            on_enter: Some(enter_connected),
            on_exit: Some(exit_connected),
        },
        StateDescriptor {
            id: ConnectionState::TransportError,
            on_enter: None,
            on_exit: None,
        },
    ]
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// Owns the table and the single authoritative [`ConnectionState`].
pub struct LinkFsm {
    table: [StateDescriptor; ConnectionState::COUNT],
    current: usize,
    ctx: LinkContext,
}

impl LinkFsm {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            table: build_state_table(),
            current: initial as usize,
            ctx: LinkContext::default(),
        }
    }

    pub fn current_state(&self) -> ConnectionState {
        self.table[self.current].id
    }

    /// Feed one input. Returns `(from, to)` when a transition happened.
    pub fn apply(&mut self, input: LinkInput) -> Option<(ConnectionState, ConnectionState)> {
        let from = self.current_state();
        let Some(to) = next_state(from, input) else {
            debug!("LINK: {:?} ignored in {}", input, from.name());
            return None;
        };

        info!("LINK: {} -> {}", from.name(), to.name());

        self.ctx.previous = Some(from);
        self.ctx.reason = match input {
            LinkInput::LastPeerLost(reason) => reason,
            _ => DisconnectReason::UNKNOWN,
        };

        if let Some(exit) = self.table[self.current].on_exit {
            exit(&mut self.ctx);
        }
        self.current = to as usize;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(&mut self.ctx);
        }

        Some((from, to))
    }

    pub fn take_effects(&mut self) -> Vec<Effect, MAX_EFFECTS> {
        self.ctx.take_effects()
    }
}
