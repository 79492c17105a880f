//! Unified error types for the console firmware.
//!
//! Each subsystem owns a small `Copy` error enum with a hand-written
//! `Display`; all of them convert into the top-level [`Error`] so the
//! bootstrap code can funnel failures through one type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Console initialisation failed.
    Init(InitError),
    /// A logical send failed.
    Send(SendError),
    /// The underlying transport reported a failure.
    Transport(TransportError),
    /// A platform collaborator could not provide a reading.
    Sensor(SensorError),
    /// A console command failed.
    Command(CommandError),
    /// An inter-core frame could not be decoded.
    Decode(DecodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Send(e) => write!(f, "send: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `init` was already called successfully on this service.
    AlreadyInitialized,
    /// The radio stack or inter-core endpoint could not be brought up.
    TransportSetupFailed,
    /// The console configuration failed validation.
    InvalidConfig,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "already initialized"),
            Self::TransportSetupFailed => write!(f, "transport setup failed"),
            Self::InvalidConfig => write!(f, "invalid console configuration"),
        }
    }
}

impl core::error::Error for InitError {}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The console service was not enabled, or the operation has no
    /// meaning on this topology.
    NotSupported,
    /// The radio stack has not finished bring-up.
    NotReady,
    /// The inter-core endpoint is unbound, or the target peer is gone.
    NotConnected,
    /// Empty payload or payload larger than one message.
    InvalidArgument,
    /// The stack or endpoint rejected the operation with a raw code.
    Failure(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported => write!(f, "not supported"),
            Self::NotReady => write!(f, "not ready"),
            Self::NotConnected => write!(f, "not connected"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Failure(code) => write!(f, "failure (err {code})"),
        }
    }
}

impl core::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Send errors
// ---------------------------------------------------------------------------

/// Failure of one logical send (possibly spanning several fragments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    NotInitialized,
    NotConnected,
    NotReady,
    NotSupported,
    InvalidArgument,
    TransportFailure(i32),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "console not initialized"),
            Self::NotConnected => write!(f, "not connected"),
            Self::NotReady => write!(f, "transport not ready"),
            Self::NotSupported => write!(f, "not supported"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::TransportFailure(code) => write!(f, "transport failure (err {code})"),
        }
    }
}

impl core::error::Error for SendError {}

impl From<TransportError> for SendError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotSupported => Self::NotSupported,
            TransportError::NotReady => Self::NotReady,
            TransportError::NotConnected => Self::NotConnected,
            TransportError::InvalidArgument => Self::InvalidArgument,
            TransportError::Failure(code) => Self::TransportFailure(code),
        }
    }
}

impl From<SendError> for Error {
    fn from(e: SendError) -> Self {
        Self::Send(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// A platform collaborator (battery gauge, die sensor, ...) was unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The peripheral is absent or not initialised.
    NotPresent,
    /// The sample could not be taken.
    ReadFailed,
    /// The sample is outside the physically plausible range.
    OutOfRange,
}

impl SensorError {
    /// Negative errno-style code used in console "unavailable" replies.
    pub const fn code(self) -> i32 {
        match self {
            Self::NotPresent => -19, // ENODEV
            Self::ReadFailed => -5,  // EIO
            Self::OutOfRange => -34, // ERANGE
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPresent => write!(f, "sensor not present"),
            Self::ReadFailed => write!(f, "sensor read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// No table entry matches the command token.
    UnknownCommand,
    /// Missing or unrecognised argument.
    InvalidArgument,
    /// A collaborator failed; carries its error code.
    Unavailable(i32),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Unavailable(code) => write!(f, "unavailable (err {code})"),
        }
    }
}

impl From<SensorError> for CommandError {
    fn from(e: SensorError) -> Self {
        Self::Unavailable(e.code())
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Inter-core frame decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the two-byte header.
    Truncated,
    /// The type byte names no known message.
    UnknownType(u8),
    /// The length byte exceeds the payload area or the received bytes.
    BadLength(u8),
    /// A connection-state payload carried an unknown state value.
    UnknownState(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "frame truncated"),
            Self::UnknownType(t) => write!(f, "unknown message type {t}"),
            Self::BadLength(n) => write!(f, "bad payload length {n}"),
            Self::UnknownState(s) => write!(f, "unknown connection state {s}"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
