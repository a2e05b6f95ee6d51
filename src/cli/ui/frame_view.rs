use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::link::{Command, DecoderStats, Event, Frame};
use crate::protocol::{CommandType, EventType};
use crate::utils::format_hex;

use super::painter::Painter;
use super::table::Table;

/// What a decoded frame means on the link.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub(crate) enum FrameMeaning {
    Command { command: CommandType },
    Event { event: Event },
    Invalid { error: String },
}

/// One frame recovered from a byte stream.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct DecodedFrame {
    opcode: u8,
    payload: String,
    meaning: FrameMeaning,
}

impl DecodedFrame {
    pub(crate) fn new(frame: &Frame) -> Self {
        let opcode = frame.frame_type();
        let payload = frame.payload();
        let meaning = if CommandType::from_opcode(opcode).is_some() {
            match Command::decode(opcode, payload) {
                Ok(command) => FrameMeaning::Command {
                    command: command.command_type(),
                },
                Err(error) => FrameMeaning::Invalid {
                    error: error.to_string(),
                },
            }
        } else if EventType::from_opcode(opcode).is_some() {
            match Event::decode(opcode, payload) {
                Ok(event) => FrameMeaning::Event { event },
                Err(error) => FrameMeaning::Invalid {
                    error: error.to_string(),
                },
            }
        } else {
            FrameMeaning::Invalid {
                error: format!("unknown opcode {opcode:#04x}"),
            }
        };
        Self {
            opcode,
            payload: format_hex(payload),
            meaning,
        }
    }

    fn describe(&self) -> String {
        match &self.meaning {
            FrameMeaning::Command { command } => format!("command {command}"),
            FrameMeaning::Event { event } => format!("event {}", event.event_type()),
            FrameMeaning::Invalid { error } => error.clone(),
        }
    }
}

/// Renders every frame found in a decoded byte stream.
pub(crate) struct FrameListView<'a> {
    frames: &'a [DecodedFrame],
    stats: DecoderStats,
    painter: &'a Painter,
}

impl<'a> FrameListView<'a> {
    pub(crate) fn new(frames: &'a [DecodedFrame], stats: DecoderStats, painter: &'a Painter) -> Self {
        Self {
            frames,
            stats,
            painter,
        }
    }
}

impl Display for FrameListView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .frames
            .iter()
            .map(|frame| {
                let meaning = match frame.meaning {
                    FrameMeaning::Invalid { .. } => self.painter.warning(frame.describe()),
                    _ => self.painter.value(frame.describe()),
                };
                vec![
                    format!("{:#04x}", frame.opcode),
                    meaning,
                    self.painter.muted(&frame.payload),
                ]
            })
            .collect();
        let table = Table::grid(["opcode", "meaning", "payload"], rows);

        write!(f, "{}", self.painter.heading("Frames:"))?;
        write!(f, "\n{table}")?;
        write!(
            f,
            "\n{} {}",
            self.painter.muted("discarded"),
            self.painter.value(self.stats.discarded().to_string())
        )
    }
}
