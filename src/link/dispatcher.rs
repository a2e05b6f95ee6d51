use tracing::{debug, instrument, warn};

use super::frame_codec::Frame;
use super::message::{Command, Event};
use super::transport::EventSink;
use crate::coordinator::{CommandOutcome, CoordinatorHandle};
use crate::error::LinkError;
use crate::protocol::CommandType;

/// What the receive loop should do after a frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DispatchOutcome {
    Continue,
    /// The stack was deactivated and the acknowledgement flushed.
    Suspend,
}

/// Routes validated command frames to the coordinator and answers each one.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    coordinator: CoordinatorHandle,
    events: EventSink,
}

impl Dispatcher {
    #[must_use]
    pub fn new(coordinator: CoordinatorHandle, events: EventSink) -> Self {
        Self {
            coordinator,
            events,
        }
    }

    /// Handles one decoded frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator or the writer has stopped.
    pub async fn dispatch(&self, frame: &Frame) -> Result<DispatchOutcome, LinkError> {
        self.dispatch_raw(frame.frame_type(), frame.payload()).await
    }

    /// Handles one frame given as opcode and payload.
    ///
    /// Invalid frames are answered with an error event and leave state untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator or the writer has stopped.
    #[instrument(skip(self, payload), level = "debug", fields(opcode = format_args!("{frame_type:#04x}"), len = payload.len()))]
    pub async fn dispatch_raw(
        &self,
        frame_type: u8,
        payload: &[u8],
    ) -> Result<DispatchOutcome, LinkError> {
        let command = match Command::decode(frame_type, payload) {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, "rejecting frame");
                self.events.emit(error.to_event());
                return Ok(DispatchOutcome::Continue);
            }
        };

        let outcome = self.coordinator.submit(command).await?;
        debug!(?command, ?outcome, "command handled");
        let ack = Event::Ack(command.command_type());
        match outcome {
            CommandOutcome::Completed => self.events.emit(ack),
            CommandOutcome::CompletedWith(event) => {
                self.events.emit(ack);
                self.events.emit(event);
            }
            CommandOutcome::Answered(event) => self.events.emit(event),
            CommandOutcome::Rejected(error) => self.events.emit(error.to_event()),
            CommandOutcome::Deactivated => {
                self.events.emit(Event::Ack(CommandType::BtDeactivate));
                self.events.flush().await?;
                return Ok(DispatchOutcome::Suspend);
            }
        }
        Ok(DispatchOutcome::Continue)
    }
}
