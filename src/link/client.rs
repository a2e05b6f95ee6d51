//! Display-controller side of the link.
//!
//! [`LinkClient`] sends commands, decodes the radio controller's events and
//! runs the heartbeat that feeds a [`HealthMonitor`].

use std::time::Duration;

use bon::Builder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::frame_codec::FrameDecoder;
use super::message::{Command, Event};
use crate::error::LinkError;
use crate::health::{DEFAULT_MISSED_PONG_THRESHOLD, HealthMonitor, HealthStatus};
use crate::utils::format_hex;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 10;
pub const DEFAULT_HANDSHAKE_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_QUEUE_CAPACITY: usize = 64;
const READ_CHUNK_LEN: usize = 128;

/// Link client settings.
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    #[builder(default = DEFAULT_HEARTBEAT_INTERVAL)]
    heartbeat_interval: Duration,
    #[builder(default = DEFAULT_MISSED_PONG_THRESHOLD)]
    missed_pong_threshold: u32,
    #[builder(default = DEFAULT_HANDSHAKE_ATTEMPTS)]
    handshake_attempts: u32,
    #[builder(default = DEFAULT_HANDSHAKE_INTERVAL)]
    handshake_interval: Duration,
    /// Capacity of the decoded event queue.
    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

type Reply = oneshot::Sender<Result<(), LinkError>>;

#[derive(Debug)]
enum ClientRequest {
    Send { command: Command, reply: Reply },
    Handshake(Reply),
}

/// Ping retries until the first pong.
#[derive(Debug)]
struct Handshake {
    sent: u32,
    next_probe: Instant,
    waiters: Vec<Reply>,
}

impl Handshake {
    fn start() -> Self {
        Self {
            sent: 0,
            next_probe: Instant::now(),
            waiters: Vec::new(),
        }
    }

    fn finish(self, result: impl Fn() -> Result<(), LinkError>) {
        for waiter in self.waiters {
            let _ = waiter.send(result());
        }
    }
}

/// Running link client.
#[derive(Debug)]
pub struct LinkClient {
    requests: mpsc::Sender<ClientRequest>,
    events: mpsc::Receiver<Event>,
    health: watch::Receiver<HealthStatus>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), LinkError>>,
}

impl LinkClient {
    /// Starts the client task. A handshake begins immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R, W>(reader: R, writer: W, config: ClientConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (requests, request_receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (event_sender, events) = mpsc::channel(config.queue_capacity.max(1));
        let (monitor, health) = HealthMonitor::new(config.missed_pong_threshold);
        let cancel = CancellationToken::new();
        let worker = ClientWorker {
            config,
            reader,
            writer,
            monitor,
            requests: request_receiver,
            events: event_sender,
            handshake: Some(Handshake::start()),
        };
        let task = tokio::spawn(worker.run(cancel.clone()));
        Self {
            requests,
            events,
            health,
            cancel,
            task,
        }
    }

    /// Writes a command frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the client has stopped.
    pub async fn send(&self, command: Command) -> Result<(), LinkError> {
        let (reply, written) = oneshot::channel();
        self.request(ClientRequest::Send { command, reply }, written)
            .await
    }

    /// Pings until the radio controller answers.
    ///
    /// # Errors
    ///
    /// Returns an error if no pong arrives within the configured attempts.
    pub async fn handshake(&self) -> Result<(), LinkError> {
        let (reply, answered) = oneshot::channel();
        self.request(ClientRequest::Handshake(reply), answered)
            .await
    }

    /// Waits for the next decoded event. Pongs are consumed by the heartbeat.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Returns a receiver for health transitions.
    #[must_use]
    pub fn health(&self) -> watch::Receiver<HealthStatus> {
        self.health.clone()
    }

    /// Stops the client.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the client task, if any.
    pub async fn close(self) -> Result<(), LinkError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|_join_error| LinkError::ClientClosed)?
    }

    async fn request(
        &self,
        request: ClientRequest,
        reply: oneshot::Receiver<Result<(), LinkError>>,
    ) -> Result<(), LinkError> {
        self.requests
            .send(request)
            .await
            .map_err(|_closed| LinkError::ClientClosed)?;
        reply.await.map_err(|_closed| LinkError::ClientClosed)?
    }
}

struct ClientWorker<R, W> {
    config: ClientConfig,
    reader: R,
    writer: W,
    monitor: HealthMonitor,
    requests: mpsc::Receiver<ClientRequest>,
    events: mpsc::Sender<Event>,
    handshake: Option<Handshake>,
}

impl<R, W> ClientWorker<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[instrument(skip_all, level = "debug", name = "link_client")]
    async fn run(mut self, cancel: CancellationToken) -> Result<(), LinkError> {
        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut decoder = FrameDecoder::new();
        let mut buffer = [0u8; READ_CHUNK_LEN];

        loop {
            let next_probe = self
                .handshake
                .as_ref()
                .map_or_else(Instant::now, |handshake| handshake.next_probe);
            tokio::select! {
                () = cancel.cancelled() => break,
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    self.handle_request(request).await?;
                }
                _ = heartbeat.tick() => {
                    self.write(Command::Ping).await?;
                    if self.monitor.record_ping() == Some(HealthStatus::Unresponsive) {
                        warn!("radio controller unresponsive, starting handshake");
                        self.handshake.get_or_insert_with(Handshake::start);
                    }
                }
                () = sleep_until(next_probe), if self.handshake.is_some() => {
                    self.probe().await?;
                }
                read = self.reader.read(&mut buffer) => {
                    let count = read.map_err(|source| LinkError::Read { source })?;
                    if count == 0 {
                        debug!(stats = ?decoder.stats(), "link closed by peer");
                        break;
                    }
                    for frame in decoder.feed_slice(&buffer[..count]) {
                        match Event::decode(frame.frame_type(), frame.payload()) {
                            Ok(event) => self.handle_event(event),
                            Err(error) => warn!(%error, "dropping undecodable event"),
                        }
                    }
                }
            }
        }

        if let Some(handshake) = self.handshake.take() {
            handshake.finish(|| Err(LinkError::ClientClosed));
        }
        Ok(())
    }

    async fn handle_request(&mut self, request: ClientRequest) -> Result<(), LinkError> {
        match request {
            ClientRequest::Send { command, reply } => {
                self.write(command).await?;
                let _ = reply.send(Ok(()));
            }
            ClientRequest::Handshake(reply) => {
                if self.handshake.is_none() && self.monitor.status() == HealthStatus::Healthy {
                    let _ = reply.send(Ok(()));
                    return Ok(());
                }
                self.handshake
                    .get_or_insert_with(Handshake::start)
                    .waiters
                    .push(reply);
            }
        }
        Ok(())
    }

    /// Sends the next handshake ping, or fails the handshake once attempts run out.
    async fn probe(&mut self) -> Result<(), LinkError> {
        let attempts = self.config.handshake_attempts;
        let Some(handshake) = self.handshake.as_mut() else {
            return Ok(());
        };
        if handshake.sent >= attempts {
            warn!(attempts, "handshake failed");
            if let Some(handshake) = self.handshake.take() {
                handshake.finish(|| Err(LinkError::HandshakeFailed { attempts }));
            }
            return Ok(());
        }
        handshake.sent += 1;
        handshake.next_probe = Instant::now() + self.config.handshake_interval;
        trace!(attempt = handshake.sent, "handshake ping");
        self.write(Command::Ping).await
    }

    fn handle_event(&mut self, event: Event) {
        if event == Event::Pong {
            self.monitor.record_pong();
            if let Some(handshake) = self.handshake.take() {
                info!(attempts = handshake.sent, "handshake complete");
                handshake.finish(|| Ok(()));
            }
            return;
        }
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!(?event, "event queue full, dropping event"),
            Err(TrySendError::Closed(_)) => trace!("event receiver dropped"),
        }
    }

    async fn write(&mut self, command: Command) -> Result<(), LinkError> {
        let wire = command.encode()?;
        trace!(command = %command.command_type(), wire = %format_hex(&wire), "sending command");
        self.writer
            .write_all(&wire)
            .await
            .map_err(|source| LinkError::Write { source })?;
        self.writer
            .flush()
            .await
            .map_err(|source| LinkError::Write { source })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, split};

    use super::*;
    use crate::link::BtState;
    use crate::link::frame_codec::FrameCodec;

    #[tokio::test(start_paused = true)]
    async fn handshake_gives_up_after_configured_attempts() {
        let (local, remote) = duplex(4096);
        let (reader, writer) = split(local);
        let config = ClientConfig::builder().handshake_attempts(2).build();
        let client = LinkClient::spawn(reader, writer, config);

        assert_matches!(
            client.handshake().await,
            Err(LinkError::HandshakeFailed { attempts: 2 })
        );
        drop(remote);
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_events_and_answers_handshake_on_pong() {
        let (local, remote) = duplex(4096);
        let (reader, writer) = split(local);
        let (_remote_reader, mut remote_writer) = split(remote);
        let mut client = LinkClient::spawn(reader, writer, ClientConfig::default());

        let mut wire = FrameCodec::encode(0xF1, &[]).expect("pong should encode");
        wire.extend(FrameCodec::encode(0x20, &[0x01]).expect("state should encode"));
        remote_writer
            .write_all(&wire)
            .await
            .expect("peer write should succeed");

        client.handshake().await.expect("handshake should succeed");
        assert_eq!(
            Some(Event::BtState(BtState::Discoverable)),
            client.next_event().await
        );
        assert_eq!(HealthStatus::Healthy, *client.health().borrow());
        client.close().await.expect("client should close cleanly");
    }
}
