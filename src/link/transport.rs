use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use super::dispatcher::{DispatchOutcome, Dispatcher};
use super::frame_codec::FrameDecoder;
use super::message::Event;
use crate::error::LinkError;
use crate::utils::format_hex;

/// Bounded wait for one read; the receive loop re-checks cancellation between reads.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK_LEN: usize = 128;

#[derive(Debug)]
enum Outbound {
    Event(Event),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget queue of outbound events.
///
/// A full queue drops the event; the link has no retransmission and periodic
/// polling covers the gap.
#[derive(Debug, Clone)]
pub struct EventSink {
    queue: mpsc::Sender<Outbound>,
}

impl EventSink {
    /// Creates a sink and the receiving half drained by the writer.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, EventReceiver) {
        let (queue, receiver) = mpsc::channel(capacity.max(1));
        (Self { queue }, EventReceiver { queue: receiver })
    }

    pub fn emit(&self, event: Event) {
        match self.queue.try_send(Outbound::Event(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(Outbound::Event(event))) => {
                warn!(?event, "event queue full, dropping event");
            }
            Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                debug!("event writer stopped, dropping event");
            }
        }
    }

    /// Waits until every event emitted before this call has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer has stopped.
    pub async fn flush(&self) -> Result<(), LinkError> {
        let (done, written) = oneshot::channel();
        self.queue
            .send(Outbound::Flush(done))
            .await
            .map_err(|_closed| LinkError::WriterClosed)?;
        written.await.map_err(|_closed| LinkError::WriterClosed)
    }
}

/// Receiving half of an [`EventSink`].
#[derive(Debug)]
pub struct EventReceiver {
    queue: mpsc::Receiver<Outbound>,
}

impl EventReceiver {
    /// Returns the next event, answering any flush requests queued before it.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.queue.recv().await? {
                Outbound::Event(event) => return Some(event),
                Outbound::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.queue.try_recv() {
                Ok(Outbound::Event(event)) => return Some(event),
                Ok(Outbound::Flush(done)) => {
                    let _ = done.send(());
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Returns every queued event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Encodes events onto `writer` until every sink is dropped, then returns the writer.
///
/// # Errors
///
/// Returns an error if writing fails.
#[instrument(skip_all, level = "debug")]
pub async fn run_writer<W>(mut events: EventReceiver, mut writer: W) -> Result<W, LinkError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let wire = match event.encode() {
            Ok(wire) => wire,
            Err(error) => {
                warn!(%error, ?event, "failed to encode event");
                continue;
            }
        };
        trace!(event = %event.event_type(), wire = %format_hex(&wire), "sending event");
        writer
            .write_all(&wire)
            .await
            .map_err(|source| LinkError::Write { source })?;
        writer
            .flush()
            .await
            .map_err(|source| LinkError::Write { source })?;
    }
    Ok(writer)
}

/// Why the receive loop returned.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReceiveOutcome {
    /// The peer closed the link.
    Closed,
    /// A deactivation was acknowledged and flushed.
    Suspend,
    Cancelled,
}

/// Reads frames from `reader` and dispatches each one in order.
///
/// # Errors
///
/// Returns an error if reading fails or the coordinator stops.
#[instrument(skip_all, level = "debug")]
pub async fn run_receiver<R>(
    reader: &mut R,
    dispatcher: &Dispatcher,
    cancel: &CancellationToken,
) -> Result<ReceiveOutcome, LinkError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut decoder = FrameDecoder::new();
    let mut buffer = [0u8; READ_CHUNK_LEN];
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => return Ok(ReceiveOutcome::Cancelled),
            read = timeout(READ_TIMEOUT, reader.read(&mut buffer)) => read,
        };
        let count = match read {
            Err(_elapsed) => continue,
            Ok(Ok(0)) => {
                debug!(stats = ?decoder.stats(), "link closed by peer");
                return Ok(ReceiveOutcome::Closed);
            }
            Ok(Ok(count)) => count,
            Ok(Err(source)) => return Err(LinkError::Read { source }),
        };

        for byte in &buffer[..count] {
            let Some(frame) = decoder.feed(*byte) else {
                continue;
            };
            if dispatcher.dispatch(&frame).await? == DispatchOutcome::Suspend {
                return Ok(ReceiveOutcome::Suspend);
            }
        }
    }
}
