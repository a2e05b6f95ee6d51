use std::str::FromStr;

use serde::Serialize;
use serde_with::SerializeDisplay;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use super::frame_codec::{FrameCodec, FrameError, MAX_PAYLOAD_LEN};
use crate::bt::ProfileError;
use crate::error::FixtureError;
use crate::protocol::{CommandType, EventType};

/// Largest volume value accepted on the link and by AVRCP.
pub const MAX_VOLUME: u8 = 127;

const MAX_TAGGED_TEXT_LEN: usize = MAX_PAYLOAD_LEN - 1;

/// Classic Bluetooth connection state reported to the display controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum BtState {
    Disconnected,
    Discoverable,
    Connecting,
    Connected,
}

impl BtState {
    /// Returns the wire byte.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Discoverable => 1,
            Self::Connecting => 2,
            Self::Connected => 3,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disconnected),
            1 => Some(Self::Discoverable),
            2 => Some(Self::Connecting),
            3 => Some(Self::Connected),
            _ => None,
        }
    }
}

/// Playback state of the connected media source.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Display, EnumIter, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum PlayState {
    #[default]
    Unknown,
    Stopped,
    Playing,
    Paused,
}

impl PlayState {
    /// Returns the wire byte.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Stopped => 1,
            Self::Playing => 2,
            Self::Paused => 3,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Stopped),
            2 => Some(Self::Playing),
            3 => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Track attribute carried by a metadata event.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum MetaKind {
    Title,
    Artist,
    Album,
    /// Track length in milliseconds, as a decimal string.
    Duration,
}

impl MetaKind {
    /// Returns the wire byte.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Title => 1,
            Self::Artist => 2,
            Self::Album => 3,
            Self::Duration => 4,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Title),
            2 => Some(Self::Artist),
            3 => Some(Self::Album),
            4 => Some(Self::Duration),
            _ => None,
        }
    }
}

/// Peer class selecting control mapping and audio-sink handling.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    SerializeDisplay,
    clap::ValueEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    /// Phones: separate Play and Pause usages.
    #[default]
    Phone,
    /// Dedicated players: every play control becomes the toggle usage.
    Controller,
    /// As [`Mode::Controller`], but the audio-sink record stays advertised.
    ControllerNoHack,
}

impl Mode {
    /// Returns the wire byte.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Phone => 0,
            Self::Controller => 1,
            Self::ControllerNoHack => 2,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Phone),
            1 => Some(Self::Controller),
            2 => Some(Self::ControllerNoHack),
            _ => None,
        }
    }
}

/// Error codes carried by [`Event::Error`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    UnknownCommand,
    InvalidPayload,
    ProfileFailure,
    BluetoothInactive,
}

impl ErrorCode {
    /// Returns the wire byte.
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::UnknownCommand => 0x01,
            Self::InvalidPayload => 0x02,
            Self::ProfileFailure => 0x03,
            Self::BluetoothInactive => 0x04,
        }
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::UnknownCommand),
            0x02 => Some(Self::InvalidPayload),
            0x03 => Some(Self::ProfileFailure),
            0x04 => Some(Self::BluetoothInactive),
            _ => None,
        }
    }

    /// Returns the canonical message sent with this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnknownCommand => "Unknown command",
            Self::InvalidPayload => "Invalid payload",
            Self::ProfileFailure => "Bluetooth profile failure",
            Self::BluetoothInactive => "Bluetooth inactive",
        }
    }
}

/// Errors raised while validating an inbound command frame.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CommandError {
    #[error("unknown command opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
    #[error("invalid payload for `{command}`: {len} byte(s)")]
    InvalidPayload { command: CommandType, len: usize },
    #[error("invalid Bluetooth mode value {value}")]
    InvalidMode { value: u8 },
    #[error("`{command}` needs an active Bluetooth stack")]
    BluetoothInactive { command: CommandType },
    #[error("`{command}` failed in the Bluetooth stack")]
    ProfileFailure {
        command: CommandType,
        source: ProfileError,
    },
}

impl CommandError {
    /// Returns the error code reported to the sender.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownOpcode { .. } => ErrorCode::UnknownCommand,
            Self::InvalidPayload { .. } | Self::InvalidMode { .. } => ErrorCode::InvalidPayload,
            Self::BluetoothInactive { .. } => ErrorCode::BluetoothInactive,
            Self::ProfileFailure { .. } => ErrorCode::ProfileFailure,
        }
    }

    /// Builds the error event reported to the sender.
    #[must_use]
    pub fn to_event(&self) -> Event {
        let code = self.code();
        let message = match self {
            Self::ProfileFailure { source, .. } => source.to_string(),
            _ => code.message().to_string(),
        };
        Event::Error { code, message }
    }
}

/// Errors raised while decoding an outbound event frame on the client side.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum EventDecodeError {
    #[error("unknown event opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
    #[error("invalid payload for `{event}`: {len} byte(s)")]
    InvalidPayload { event: EventType, len: usize },
    #[error("invalid value {value:#04x} for `{event}`")]
    InvalidValue { event: EventType, value: u8 },
    #[error("`{event}` text is not valid UTF-8")]
    InvalidText { event: EventType },
}

/// A validated command from the display controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Play,
    Pause,
    PlayPause,
    Next,
    Prev,
    VolUp,
    VolDown,
    /// Raw requested volume; clamped to [`MAX_VOLUME`] when applied.
    SetVolume(u8),
    BtConnect,
    BtDisconnect,
    BtPairMode,
    BtActivate,
    BtDeactivate,
    BtSetMode(Mode),
    BtGetMode,
    Ping,
}

impl Command {
    /// Returns the opcode family.
    #[must_use]
    pub fn command_type(self) -> CommandType {
        match self {
            Self::Play => CommandType::Play,
            Self::Pause => CommandType::Pause,
            Self::PlayPause => CommandType::PlayPause,
            Self::Next => CommandType::Next,
            Self::Prev => CommandType::Prev,
            Self::VolUp => CommandType::VolUp,
            Self::VolDown => CommandType::VolDown,
            Self::SetVolume(_) => CommandType::SetVolume,
            Self::BtConnect => CommandType::BtConnect,
            Self::BtDisconnect => CommandType::BtDisconnect,
            Self::BtPairMode => CommandType::BtPairMode,
            Self::BtActivate => CommandType::BtActivate,
            Self::BtDeactivate => CommandType::BtDeactivate,
            Self::BtSetMode(_) => CommandType::BtSetMode,
            Self::BtGetMode => CommandType::BtGetMode,
            Self::Ping => CommandType::Ping,
        }
    }

    /// Validates a decoded frame and builds the command it carries.
    ///
    /// ```
    /// use knob_link::{Command, CommandError, CommandType};
    ///
    /// assert_eq!(Ok(Command::SetVolume(70)), Command::decode(0x07, &[70]));
    /// assert_eq!(
    ///     Err(CommandError::InvalidPayload { command: CommandType::SetVolume, len: 0 }),
    ///     Command::decode(0x07, &[]),
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for unknown opcodes, payloads of the wrong length, and
    /// unknown mode values.
    pub fn decode(frame_type: u8, payload: &[u8]) -> Result<Self, CommandError> {
        let command_type = CommandType::from_opcode(frame_type)
            .ok_or(CommandError::UnknownOpcode { opcode: frame_type })?;
        if !command_type.shape().accepts(payload.len()) {
            return Err(CommandError::InvalidPayload {
                command: command_type,
                len: payload.len(),
            });
        }

        let command = match command_type {
            CommandType::Play => Self::Play,
            CommandType::Pause => Self::Pause,
            CommandType::PlayPause => Self::PlayPause,
            CommandType::Next => Self::Next,
            CommandType::Prev => Self::Prev,
            CommandType::VolUp => Self::VolUp,
            CommandType::VolDown => Self::VolDown,
            CommandType::SetVolume => Self::SetVolume(single_byte(command_type, payload)?),
            CommandType::BtConnect => Self::BtConnect,
            CommandType::BtDisconnect => Self::BtDisconnect,
            CommandType::BtPairMode => Self::BtPairMode,
            CommandType::BtActivate => Self::BtActivate,
            CommandType::BtDeactivate => Self::BtDeactivate,
            CommandType::BtSetMode => {
                let value = single_byte(command_type, payload)?;
                Self::BtSetMode(Mode::from_wire(value).ok_or(CommandError::InvalidMode { value })?)
            }
            CommandType::BtGetMode => Self::BtGetMode,
            CommandType::Ping => Self::Ping,
        };
        Ok(command)
    }

    /// Returns the payload bytes sent with this command.
    #[must_use]
    pub fn payload(self) -> Vec<u8> {
        match self {
            Self::SetVolume(volume) => vec![volume],
            Self::BtSetMode(mode) => vec![mode.wire_value()],
            _ => Vec::new(),
        }
    }

    /// Encodes the command into its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if frame encoding fails.
    pub fn encode(self) -> Result<Vec<u8>, FrameError> {
        FrameCodec::encode(self.command_type().opcode(), &self.payload())
    }
}

impl FromStr for Command {
    type Err = FixtureError;

    /// Parses `name` or `name:argument`, e.g. `play`, `set_volume:70`,
    /// `bt_set_mode:controller`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, argument) = match value.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (value.trim(), None),
        };
        let unknown = || FixtureError::UnknownCommand {
            value: value.to_string(),
        };

        let command = match (name, argument) {
            ("play", None) => Self::Play,
            ("pause", None) => Self::Pause,
            ("play_pause", None) => Self::PlayPause,
            ("next", None) => Self::Next,
            ("prev", None) => Self::Prev,
            ("vol_up", None) => Self::VolUp,
            ("vol_down", None) => Self::VolDown,
            ("set_volume", Some(argument)) => {
                let volume = argument
                    .parse::<u8>()
                    .map_err(|_error| FixtureError::InvalidNumber {
                        value: argument.to_string(),
                    })?;
                Self::SetVolume(volume)
            }
            ("bt_connect", None) => Self::BtConnect,
            ("bt_disconnect", None) => Self::BtDisconnect,
            ("bt_pair_mode", None) => Self::BtPairMode,
            ("bt_activate", None) => Self::BtActivate,
            ("bt_deactivate", None) => Self::BtDeactivate,
            ("bt_set_mode", Some(argument)) => {
                Self::BtSetMode(Mode::from_str(argument).map_err(|_error| unknown())?)
            }
            ("bt_get_mode", None) => Self::BtGetMode,
            ("ping", None) => Self::Ping,
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

/// An event sent back to the display controller.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    BtState(BtState),
    PlayStatus(PlayState),
    Metadata { kind: MetaKind, text: String },
    DeviceName(String),
    Volume(u8),
    /// Playback position in milliseconds.
    Position(u32),
    BtMode(Mode),
    Ack(CommandType),
    Error { code: ErrorCode, message: String },
    Pong,
}

impl Event {
    /// Returns the opcode family.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::BtState(_) => EventType::BtState,
            Self::PlayStatus(_) => EventType::PlayStatus,
            Self::Metadata { .. } => EventType::Metadata,
            Self::DeviceName(_) => EventType::DeviceName,
            Self::Volume(_) => EventType::Volume,
            Self::Position(_) => EventType::Position,
            Self::BtMode(_) => EventType::BtMode,
            Self::Ack(_) => EventType::Ack,
            Self::Error { .. } => EventType::Error,
            Self::Pong => EventType::Pong,
        }
    }

    /// Returns the payload bytes, truncating text on a character boundary.
    ///
    /// ```
    /// use knob_link::{Event, MetaKind};
    ///
    /// let event = Event::Metadata { kind: MetaKind::Artist, text: "Radiohead".to_string() };
    /// assert_eq!(b"\x02Radiohead".to_vec(), event.payload());
    /// ```
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::BtState(state) => vec![state.wire_value()],
            Self::PlayStatus(state) => vec![state.wire_value()],
            Self::Metadata { kind, text } => {
                tagged_text(kind.wire_value(), text, MAX_TAGGED_TEXT_LEN)
            }
            Self::DeviceName(name) => truncate_utf8(name, MAX_PAYLOAD_LEN).as_bytes().to_vec(),
            Self::Volume(volume) => vec![*volume],
            Self::Position(position_ms) => position_ms.to_le_bytes().to_vec(),
            Self::BtMode(mode) => vec![mode.wire_value()],
            Self::Ack(command) => vec![command.opcode()],
            Self::Error { code, message } => {
                tagged_text(code.wire_value(), message, MAX_TAGGED_TEXT_LEN)
            }
            Self::Pong => Vec::new(),
        }
    }

    /// Encodes the event into its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if frame encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        FrameCodec::encode(self.event_type().opcode(), &self.payload())
    }

    /// Decodes an event frame received from the radio controller.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown opcodes and malformed payloads.
    pub fn decode(frame_type: u8, payload: &[u8]) -> Result<Self, EventDecodeError> {
        let event = EventType::from_opcode(frame_type)
            .ok_or(EventDecodeError::UnknownOpcode { opcode: frame_type })?;
        let invalid_payload = || EventDecodeError::InvalidPayload {
            event,
            len: payload.len(),
        };
        let invalid_value = |value: u8| EventDecodeError::InvalidValue { event, value };

        let decoded = match event {
            EventType::BtState => {
                let value = exact_byte(payload).ok_or_else(invalid_payload)?;
                Self::BtState(BtState::from_wire(value).ok_or_else(|| invalid_value(value))?)
            }
            EventType::PlayStatus => {
                let value = exact_byte(payload).ok_or_else(invalid_payload)?;
                Self::PlayStatus(PlayState::from_wire(value).ok_or_else(|| invalid_value(value))?)
            }
            EventType::Metadata => {
                let (tag, text) = payload.split_first().ok_or_else(invalid_payload)?;
                Self::Metadata {
                    kind: MetaKind::from_wire(*tag).ok_or_else(|| invalid_value(*tag))?,
                    text: decode_text(event, text)?,
                }
            }
            EventType::DeviceName => Self::DeviceName(decode_text(event, payload)?),
            EventType::Volume => Self::Volume(exact_byte(payload).ok_or_else(invalid_payload)?),
            EventType::Position => {
                let bytes: [u8; 4] = payload.try_into().map_err(|_error| invalid_payload())?;
                Self::Position(u32::from_le_bytes(bytes))
            }
            EventType::BtMode => {
                let value = exact_byte(payload).ok_or_else(invalid_payload)?;
                Self::BtMode(Mode::from_wire(value).ok_or_else(|| invalid_value(value))?)
            }
            EventType::Ack => {
                let value = exact_byte(payload).ok_or_else(invalid_payload)?;
                Self::Ack(CommandType::from_opcode(value).ok_or_else(|| invalid_value(value))?)
            }
            EventType::Error => {
                let (code, message) = payload.split_first().ok_or_else(invalid_payload)?;
                Self::Error {
                    code: ErrorCode::from_wire(*code).ok_or_else(|| invalid_value(*code))?,
                    message: decode_text(event, message)?,
                }
            }
            EventType::Pong => Self::Pong,
        };
        Ok(decoded)
    }
}

/// Returns the longest prefix of `text` that fits in `max_len` bytes without
/// splitting a character.
pub(crate) fn truncate_utf8(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn tagged_text(tag: u8, text: &str, max_len: usize) -> Vec<u8> {
    let text = truncate_utf8(text, max_len);
    let mut payload = Vec::with_capacity(1 + text.len());
    payload.push(tag);
    payload.extend_from_slice(text.as_bytes());
    payload
}

fn single_byte(command: CommandType, payload: &[u8]) -> Result<u8, CommandError> {
    payload
        .first()
        .copied()
        .ok_or(CommandError::InvalidPayload {
            command,
            len: payload.len(),
        })
}

fn exact_byte(payload: &[u8]) -> Option<u8> {
    match payload {
        [value] => Some(*value),
        _ => None,
    }
}

fn decode_text(event: EventType, bytes: &[u8]) -> Result<String, EventDecodeError> {
    String::from_utf8(bytes.to_vec()).map_err(|_error| EventDecodeError::InvalidText { event })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::play(0x01, vec![], Command::Play)]
    #[case::play_with_trailing(0x01, vec![0xAA], Command::Play)]
    #[case::set_volume(0x07, vec![70], Command::SetVolume(70))]
    #[case::set_volume_unclamped(0x07, vec![200], Command::SetVolume(200))]
    #[case::set_mode(0x15, vec![1], Command::BtSetMode(Mode::Controller))]
    #[case::ping(0xF0, vec![], Command::Ping)]
    fn decode_accepts_valid_commands(
        #[case] frame_type: u8,
        #[case] payload: Vec<u8>,
        #[case] expected: Command,
    ) {
        assert_eq!(Ok(expected), Command::decode(frame_type, &payload));
    }

    #[rstest]
    #[case::unknown(0x42, vec![], CommandError::UnknownOpcode { opcode: 0x42 })]
    #[case::empty_volume(
        0x07,
        vec![],
        CommandError::InvalidPayload { command: CommandType::SetVolume, len: 0 }
    )]
    #[case::long_volume(
        0x07,
        vec![1, 2],
        CommandError::InvalidPayload { command: CommandType::SetVolume, len: 2 }
    )]
    #[case::bad_mode(0x15, vec![9], CommandError::InvalidMode { value: 9 })]
    fn decode_rejects_invalid_commands(
        #[case] frame_type: u8,
        #[case] payload: Vec<u8>,
        #[case] expected: CommandError,
    ) {
        assert_eq!(Err(expected), Command::decode(frame_type, &payload));
    }

    #[rstest]
    #[case(CommandError::UnknownOpcode { opcode: 0x42 }, 0x01, "Unknown command")]
    #[case(CommandError::InvalidMode { value: 7 }, 0x02, "Invalid payload")]
    #[case(
        CommandError::BluetoothInactive { command: CommandType::Play },
        0x04,
        "Bluetooth inactive"
    )]
    fn command_errors_map_to_error_events(
        #[case] error: CommandError,
        #[case] code: u8,
        #[case] message: &str,
    ) {
        let event = error.to_event();
        let mut expected = vec![code];
        expected.extend_from_slice(message.as_bytes());
        assert_eq!(expected, event.payload());
    }

    #[test]
    fn metadata_text_is_truncated_on_char_boundary() {
        let text = "é".repeat(200);
        let event = Event::Metadata {
            kind: MetaKind::Title,
            text,
        };

        let payload = event.payload();
        assert_eq!(1 + 254, payload.len());
        let decoded = Event::decode(0x22, &payload).expect("truncated text should stay valid UTF-8");
        assert_matches!(decoded, Event::Metadata { kind: MetaKind::Title, text } if text.chars().count() == 127);
    }

    #[test]
    fn device_name_fills_whole_payload() {
        let name = "x".repeat(300);
        assert_eq!(MAX_PAYLOAD_LEN, Event::DeviceName(name).payload().len());
    }

    #[test]
    fn position_is_little_endian() {
        assert_eq!(vec![0x10, 0x27, 0x00, 0x00], Event::Position(10_000).payload());
    }

    #[rstest]
    #[case(Event::BtState(BtState::Connected))]
    #[case(Event::PlayStatus(PlayState::Paused))]
    #[case(Event::Ack(CommandType::SetVolume))]
    #[case(Event::Position(183_000))]
    #[case(Event::Error { code: ErrorCode::ProfileFailure, message: "ble_hid: pairing failed".to_string() })]
    #[case(Event::Pong)]
    fn events_decode_from_their_payload(#[case] event: Event) {
        let decoded = Event::decode(event.event_type().opcode(), &event.payload())
            .expect("encoded payload should decode");
        assert_eq!(event, decoded);
    }

    #[test]
    fn event_decode_rejects_unknown_state_value() {
        assert_eq!(
            Err(EventDecodeError::InvalidValue {
                event: EventType::BtState,
                value: 9
            }),
            Event::decode(0x20, &[9])
        );
    }

    #[rstest]
    #[case("play", Command::Play)]
    #[case("set_volume:70", Command::SetVolume(70))]
    #[case("bt_set_mode:controller_no_hack", Command::BtSetMode(Mode::ControllerNoHack))]
    #[case(" ping ", Command::Ping)]
    fn command_parses_from_cli_text(#[case] text: &str, #[case] expected: Command) {
        assert_eq!(expected, text.parse::<Command>().expect("command text should parse"));
    }

    #[test]
    fn command_text_rejects_missing_argument() {
        assert_matches!(
            "set_volume".parse::<Command>(),
            Err(FixtureError::UnknownCommand { .. })
        );
    }

    #[test]
    fn event_serialises_as_tagged_json() {
        let json = serde_json::to_string(&Event::Metadata {
            kind: MetaKind::Artist,
            text: "Radiohead".to_string(),
        })
        .expect("event should serialise");
        assert_eq!(
            r#"{"event":"metadata","data":{"kind":"artist","text":"Radiohead"}}"#,
            json
        );
    }
}
