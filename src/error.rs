use std::path::PathBuf;

use derive_more::From;
use thiserror::Error;

use crate::bonds::BondStoreError;
use crate::bt::ProfileError;
use crate::link::{CommandError, EventDecodeError, FrameError};

/// Errors returned by link transport operations.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open link `{path}`")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read from the link")]
    Read { source: std::io::Error },
    #[error("failed to write to the link")]
    Write { source: std::io::Error },
    #[error("failed to encode an outbound frame")]
    Encode(#[from] FrameError),
    #[error("the link writer has stopped")]
    WriterClosed,
    #[error("the coordinator has stopped")]
    CoordinatorClosed,
    #[error("the link client has stopped")]
    ClientClosed,
    #[error("no pong received after {attempts} handshake attempts")]
    HandshakeFailed { attempts: u32 },
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: std::io::Error },
}

/// Errors returned when parsing simulated Bluetooth stack scripts.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("script steps must have the form `delay|event[|argument...]`")]
    InvalidStepFieldCount,
    #[error("script steps cannot contain empty mandatory fields")]
    EmptyStepField,
    #[error("invalid step delay `{value}`")]
    InvalidDelay { value: String },
    #[error("unknown script event `{name}`")]
    UnknownEvent { name: String },
    #[error("script event `{name}` expects {expected} argument(s)")]
    InvalidArgumentCount { name: String, expected: usize },
    #[error("invalid Bluetooth address `{value}`")]
    InvalidAddress { value: String },
    #[error("invalid numeric argument `{value}`")]
    InvalidNumber { value: String },
    #[error("unknown notification kind `{value}`")]
    UnknownNotificationKind { value: String },
    #[error("unknown audio sink state `{value}`")]
    UnknownAudioSinkState { value: String },
    #[error("hex payload is invalid")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("unknown command `{value}`")]
    UnknownCommand { value: String },
}

/// Errors returned when validating runtime options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("`frame encode` payloads are limited to 255 bytes, got {len}")]
    PayloadTooLarge { len: usize },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(FrameError, Box<FrameError>)]
    Frame(Box<FrameError>),
    #[error(transparent)]
    #[from(CommandError, Box<CommandError>)]
    Command(Box<CommandError>),
    #[error(transparent)]
    #[from(EventDecodeError, Box<EventDecodeError>)]
    EventDecode(Box<EventDecodeError>),
    #[error(transparent)]
    #[from(ProfileError, Box<ProfileError>)]
    Profile(Box<ProfileError>),
    #[error(transparent)]
    #[from(LinkError, Box<LinkError>)]
    Link(Box<LinkError>),
    #[error(transparent)]
    #[from(BondStoreError, Box<BondStoreError>)]
    BondStore(Box<BondStoreError>),
    #[error(transparent)]
    #[from(FixtureError, Box<FixtureError>)]
    Fixture(Box<FixtureError>),
}
