use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::health::HealthStatus;
use crate::link::{BtState, Event};

/// Applies colour and style to terminal text.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    /// Creates a painter with explicit colour control.
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().yellow())
    }

    pub(crate) fn failure<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().red())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Colours an event name by how it reads to an operator.
    pub(crate) fn event_name(&self, event: &Event) -> String {
        let name = event.event_type().to_string();
        match event {
            Event::Error { .. } => self.failure(name),
            Event::Ack(_) | Event::Pong => self.muted(name),
            Event::BtState(BtState::Connected) => self.success(name),
            _ => self.heading(name),
        }
    }

    pub(crate) fn health(&self, status: HealthStatus) -> String {
        let text = status.to_string();
        match status {
            HealthStatus::Healthy => self.success(text),
            HealthStatus::Unresponsive => self.failure(text),
            HealthStatus::Unknown => self.warning(text),
        }
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}
