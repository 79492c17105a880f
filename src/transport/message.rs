//! Inter-core message frame.
//!
//! Every message crosses the shared channel as one fixed-size frame:
//!
//! ```text
//! ┌──────┬──────┬──────────────────────────────┐
//! │ Type │ Len  │  Payload (Len bytes, rest 0) │
//! │ (1B) │ (1B) │  128 bytes                   │
//! └──────┴──────┴──────────────────────────────┘
//! ```
//!
//! The frame is always sent whole (130 bytes) even when `Len` is small.
//! A `ConnectionState` payload carries the state in byte 0 using the
//! companion's numbering: 0 = disconnected, 1 = connected, 2 = advertising.

use heapless::Vec;

use crate::error::DecodeError;
use crate::fsm::ConnectionState;

/// Payload area of one frame.
pub const MAX_PAYLOAD: usize = 128;
const HEADER_LEN: usize = 2;
/// Size of an encoded frame on the wire.
pub const FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Init = 1,
    SendData = 2,
    ConnectionState = 3,
    DataReceived = 4,
    Test = 5,
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(raw: u8) -> Result<Self, DecodeError> {
        match raw {
            1 => Ok(Self::Init),
            2 => Ok(Self::SendData),
            3 => Ok(Self::ConnectionState),
            4 => Ok(Self::DataReceived),
            5 => Ok(Self::Test),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

/// Companion wire value for a connection state. `TransportError` is a
/// local notion and has no wire value.
pub fn state_to_wire(state: ConnectionState) -> Option<u8> {
    match state {
        ConnectionState::Disconnected => Some(0),
        ConnectionState::Connected => Some(1),
        ConnectionState::Advertising => Some(2),
        ConnectionState::TransportError => None,
    }
}

pub fn state_from_wire(raw: u8) -> Result<ConnectionState, DecodeError> {
    match raw {
        0 => Ok(ConnectionState::Disconnected),
        1 => Ok(ConnectionState::Connected),
        2 => Ok(ConnectionState::Advertising),
        other => Err(DecodeError::UnknownState(other)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub kind: MessageType,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl TransportMessage {
    /// Build a message; `None` if `payload` exceeds [`MAX_PAYLOAD`].
    pub fn new(kind: MessageType, payload: &[u8]) -> Option<Self> {
        Vec::from_slice(payload)
            .ok()
            .map(|payload| Self { kind, payload })
    }

    pub fn state(state: ConnectionState) -> Option<Self> {
        let wire = state_to_wire(state)?;
        Self::new(MessageType::ConnectionState, &[wire])
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.kind as u8;
        frame[1] = self.payload.len() as u8;
        frame[HEADER_LEN..HEADER_LEN + self.payload.len()].copy_from_slice(&self.payload);
        frame
    }

    /// Decode a received frame. Short frames are accepted as long as they
    /// hold the header and `Len` payload bytes.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() < HEADER_LEN {
            return Err(DecodeError::Truncated);
        }
        let kind = MessageType::try_from(raw[0])?;
        let len = raw[1];
        let end = HEADER_LEN + len as usize;
        if len as usize > MAX_PAYLOAD || end > raw.len() {
            return Err(DecodeError::BadLength(len));
        }
        let payload = Vec::from_slice(&raw[HEADER_LEN..end]).map_err(|_| DecodeError::BadLength(len))?;
        Ok(Self { kind, payload })
    }

    /// Interpret a `ConnectionState` payload.
    pub fn reported_state(&self) -> Result<ConnectionState, DecodeError> {
        let raw = *self.payload.first().ok_or(DecodeError::BadLength(0))?;
        state_from_wire(raw)
    }
}
