use std::fmt::{self, Display, Formatter};

use crate::app::ServeSummary;
use crate::health::HealthStatus;
use crate::link::Event;

use super::painter::Painter;
use super::table::Table;

/// Renders one event received from the radio controller.
pub(crate) struct EventView<'a> {
    event: &'a Event,
    painter: &'a Painter,
}

impl<'a> EventView<'a> {
    pub(crate) fn new(event: &'a Event, painter: &'a Painter) -> Self {
        Self { event, painter }
    }
}

impl Display for EventView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.painter.event_name(self.event);
        let detail = match self.event {
            Event::BtState(state) => self.painter.value(state.to_string()),
            Event::PlayStatus(state) => self.painter.value(state.to_string()),
            Event::Metadata { kind, text } => {
                format!("{} {}", self.painter.muted(kind.to_string()), self.painter.value(text))
            }
            Event::DeviceName(name) => self.painter.value(name),
            Event::Volume(volume) => self.painter.value(volume.to_string()),
            Event::Position(position_ms) => {
                format!("{} {}", self.painter.value(position_ms.to_string()), self.painter.muted("ms"))
            }
            Event::BtMode(mode) => self.painter.value(mode.to_string()),
            Event::Ack(command) => self.painter.muted(command.to_string()),
            Event::Error { code, message } => format!(
                "{} {}",
                self.painter.failure(code.to_string()),
                self.painter.muted(message)
            ),
            Event::Pong => String::new(),
        };
        if detail.is_empty() {
            write!(f, "{name}")
        } else {
            write!(f, "{name} {detail}")
        }
    }
}

/// Renders a heartbeat health transition.
pub(crate) struct HealthView<'a> {
    status: HealthStatus,
    painter: &'a Painter,
}

impl<'a> HealthView<'a> {
    pub(crate) fn new(status: HealthStatus, painter: &'a Painter) -> Self {
        Self { status, painter }
    }
}

impl Display for HealthView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.painter.muted("health"),
            self.painter.health(self.status)
        )
    }
}

/// Renders the end-of-run summary of the radio controller.
pub(crate) struct ServeSummaryView<'a> {
    summary: &'a ServeSummary,
    painter: &'a Painter,
}

impl<'a> ServeSummaryView<'a> {
    pub(crate) fn new(summary: &'a ServeSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ServeSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let table = Table::key_value(
            self.painter,
            vec![
                ("sessions", self.painter.value(self.summary.sessions().to_string())),
                ("suspends", self.painter.value(self.summary.suspends().to_string())),
            ],
        );
        write!(f, "{}", self.painter.heading("Radio controller stopped:"))?;
        write!(f, "\n{table}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::link::{BtState, ErrorCode, MetaKind};
    use crate::protocol::CommandType;

    #[rstest]
    #[case(Event::BtState(BtState::Connected), "bt_state connected")]
    #[case(
        Event::Metadata { kind: MetaKind::Artist, text: "Radiohead".to_string() },
        "metadata artist Radiohead"
    )]
    #[case(Event::Position(1500), "position 1500 ms")]
    #[case(Event::Ack(CommandType::Play), "ack play")]
    #[case(
        Event::Error { code: ErrorCode::InvalidPayload, message: "Invalid payload".to_string() },
        "error invalid_payload Invalid payload"
    )]
    #[case(Event::Pong, "pong")]
    fn renders_events_as_single_lines(#[case] event: Event, #[case] expected: &str) {
        let painter = Painter::new(false);

        assert_eq!(expected, EventView::new(&event, &painter).to_string());
    }

    #[test]
    fn renders_health_transitions() {
        let painter = Painter::new(false);

        assert_eq!(
            "health healthy",
            HealthView::new(HealthStatus::Healthy, &painter).to_string()
        );
    }
}
