use std::collections::HashMap;
use std::sync::LazyLock;

use serde_with::SerializeDisplay;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Commands sent by the display controller to the radio controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display, SerializeDisplay)]
pub enum CommandType {
    #[strum(to_string = "play")]
    Play,
    #[strum(to_string = "pause")]
    Pause,
    #[strum(to_string = "next")]
    Next,
    #[strum(to_string = "prev")]
    Prev,
    #[strum(to_string = "vol_up")]
    VolUp,
    #[strum(to_string = "vol_down")]
    VolDown,
    #[strum(to_string = "set_volume")]
    SetVolume,
    #[strum(to_string = "play_pause")]
    PlayPause,
    #[strum(to_string = "bt_connect")]
    BtConnect,
    #[strum(to_string = "bt_disconnect")]
    BtDisconnect,
    #[strum(to_string = "bt_pair_mode")]
    BtPairMode,
    #[strum(to_string = "bt_activate")]
    BtActivate,
    #[strum(to_string = "bt_deactivate")]
    BtDeactivate,
    #[strum(to_string = "bt_set_mode")]
    BtSetMode,
    #[strum(to_string = "bt_get_mode")]
    BtGetMode,
    #[strum(to_string = "ping")]
    Ping,
}

/// Events sent by the radio controller back to the display controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display, SerializeDisplay)]
pub enum EventType {
    #[strum(to_string = "bt_state")]
    BtState,
    #[strum(to_string = "play_status")]
    PlayStatus,
    #[strum(to_string = "metadata")]
    Metadata,
    #[strum(to_string = "device_name")]
    DeviceName,
    #[strum(to_string = "volume")]
    Volume,
    #[strum(to_string = "position")]
    Position,
    #[strum(to_string = "bt_mode")]
    BtMode,
    #[strum(to_string = "pong")]
    Pong,
    #[strum(to_string = "ack")]
    Ack,
    #[strum(to_string = "error")]
    Error,
}

/// Payload layout a command must carry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum PayloadShape {
    /// No payload is read; trailing bytes are ignored.
    Ignored,
    /// Exactly this many bytes.
    Exact(usize),
}

impl PayloadShape {
    pub(crate) fn accepts(self, len: usize) -> bool {
        match self {
            Self::Ignored => true,
            Self::Exact(expected) => len == expected,
        }
    }
}

/// Descriptive metadata for one command opcode.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct CommandMetadata {
    opcode: u8,
    shape: PayloadShape,
}

impl CommandMetadata {
    pub(crate) fn opcode(self) -> u8 {
        self.opcode
    }

    pub(crate) fn shape(self) -> PayloadShape {
        self.shape
    }
}

static COMMANDS_BY_OPCODE: LazyLock<HashMap<u8, CommandType>> = LazyLock::new(|| {
    CommandType::iter()
        .map(|command| (command_metadata(command).opcode(), command))
        .collect()
});

static EVENTS_BY_OPCODE: LazyLock<HashMap<u8, EventType>> = LazyLock::new(|| {
    EventType::iter()
        .map(|event| (event.opcode(), event))
        .collect()
});

impl CommandType {
    /// Returns the wire opcode.
    ///
    /// ```
    /// use knob_link::CommandType;
    ///
    /// assert_eq!(0x07, CommandType::SetVolume.opcode());
    /// assert_eq!(0xF0, CommandType::Ping.opcode());
    /// ```
    #[must_use]
    pub fn opcode(self) -> u8 {
        command_metadata(self).opcode()
    }

    /// Looks up a command by wire opcode.
    ///
    /// ```
    /// use knob_link::CommandType;
    ///
    /// assert_eq!(Some(CommandType::PlayPause), CommandType::from_opcode(0x08));
    /// assert_eq!(None, CommandType::from_opcode(0x42));
    /// ```
    #[must_use]
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        COMMANDS_BY_OPCODE.get(&opcode).copied()
    }

    pub(crate) fn shape(self) -> PayloadShape {
        command_metadata(self).shape()
    }
}

impl EventType {
    /// Returns the wire opcode.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::BtState => 0x20,
            Self::PlayStatus => 0x21,
            Self::Metadata => 0x22,
            Self::DeviceName => 0x23,
            Self::Volume => 0x24,
            Self::Position => 0x25,
            Self::BtMode => 0x26,
            Self::Pong => 0xF1,
            Self::Ack => 0xFE,
            Self::Error => 0xFF,
        }
    }

    /// Looks up an event by wire opcode.
    #[must_use]
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        EVENTS_BY_OPCODE.get(&opcode).copied()
    }
}

pub(crate) fn command_metadata(command: CommandType) -> CommandMetadata {
    let (opcode, shape) = match command {
        CommandType::Play => (0x01, PayloadShape::Ignored),
        CommandType::Pause => (0x02, PayloadShape::Ignored),
        CommandType::Next => (0x03, PayloadShape::Ignored),
        CommandType::Prev => (0x04, PayloadShape::Ignored),
        CommandType::VolUp => (0x05, PayloadShape::Ignored),
        CommandType::VolDown => (0x06, PayloadShape::Ignored),
        CommandType::SetVolume => (0x07, PayloadShape::Exact(1)),
        CommandType::PlayPause => (0x08, PayloadShape::Ignored),
        CommandType::BtConnect => (0x10, PayloadShape::Ignored),
        CommandType::BtDisconnect => (0x11, PayloadShape::Ignored),
        CommandType::BtPairMode => (0x12, PayloadShape::Ignored),
        CommandType::BtActivate => (0x13, PayloadShape::Ignored),
        CommandType::BtDeactivate => (0x14, PayloadShape::Ignored),
        CommandType::BtSetMode => (0x15, PayloadShape::Exact(1)),
        CommandType::BtGetMode => (0x16, PayloadShape::Ignored),
        CommandType::Ping => (0xF0, PayloadShape::Ignored),
    };
    CommandMetadata { opcode, shape }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn command_opcodes_are_unique() {
        assert_eq!(CommandType::iter().count(), COMMANDS_BY_OPCODE.len());
    }

    #[test]
    fn event_opcodes_are_unique() {
        assert_eq!(EventType::iter().count(), EVENTS_BY_OPCODE.len());
    }

    #[rstest]
    #[case(CommandType::SetVolume, 0, false)]
    #[case(CommandType::SetVolume, 1, true)]
    #[case(CommandType::SetVolume, 2, false)]
    #[case(CommandType::Play, 0, true)]
    #[case(CommandType::Play, 3, true)]
    fn payload_shape_matches_command(
        #[case] command: CommandType,
        #[case] len: usize,
        #[case] accepted: bool,
    ) {
        assert_eq!(accepted, command.shape().accepts(len));
    }

    #[test]
    fn opcodes_round_trip_through_lookup() {
        for command in CommandType::iter() {
            assert_eq!(Some(command), CommandType::from_opcode(command.opcode()));
        }
        for event in EventType::iter() {
            assert_eq!(Some(event), EventType::from_opcode(event.opcode()));
        }
    }
}
