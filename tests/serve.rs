use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use knob_link::{
    BondStore, BtState, ClientConfig, Command, Event, FakeStackBackend, FakeStackConfig,
    FrameDecoder, LinkActivityWake, LinkClient, MetaKind, Mode, Profile, ProtocolError,
    ServeConfig, ServeContext, ServeSummary, StackScript, serve,
};

type ServeTask = JoinHandle<Result<ServeSummary, ProtocolError>>;

/// Runs the radio controller on one end of an in-memory link.
fn spawn_serve(
    backend: FakeStackBackend,
    cancel: CancellationToken,
) -> (ServeTask, DuplexStream) {
    let (radio, controller) = duplex(4096);
    let task = tokio::spawn(async move {
        let (reader, writer) = split(radio);
        let power = LinkActivityWake;
        let context = ServeContext {
            backend: Arc::new(backend),
            bonds: BondStore::in_memory(),
            power: &power,
            cancel,
        };
        serve(reader, writer, ServeConfig::default(), context).await
    });
    (task, controller)
}

/// Display-controller end that writes raw command frames and decodes events.
struct RawController {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    decoder: FrameDecoder,
}

impl RawController {
    fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = split(stream);
        Self {
            reader,
            writer,
            decoder: FrameDecoder::new(),
        }
    }

    async fn send(&mut self, command: Command) {
        let wire = command.encode().expect("command should encode");
        self.writer
            .write_all(&wire)
            .await
            .expect("controller write should succeed");
    }

    async fn read_events(&mut self, count: usize) -> Vec<Event> {
        let mut events = Vec::new();
        let mut buffer = [0u8; 256];
        while events.len() < count {
            let read = self
                .reader
                .read(&mut buffer)
                .await
                .expect("controller read should succeed");
            assert!(read > 0, "link closed after {events:?}");
            for frame in self.decoder.feed_slice(&buffer[..read]) {
                events.push(
                    Event::decode(frame.frame_type(), frame.payload())
                        .expect("event should decode"),
                );
            }
        }
        events
    }
}

#[tokio::test(start_paused = true)]
async fn client_sees_connection_metadata_and_volume() -> anyhow::Result<()> {
    let script: StackScript = "0ms|ble-connect|AA:BB:CC:DD:EE:01;\
                               0ms|avrcp-connect|AA:BB:CC:DD:EE:02;\
                               0ms|meta|0x02|Radiohead"
        .parse()?;
    let backend = FakeStackBackend::new(FakeStackConfig::builder().script(script).build());
    let (task, controller) = spawn_serve(backend, CancellationToken::new());
    let (reader, writer) = split(controller);
    let mut client = LinkClient::spawn(reader, writer, ClientConfig::default());

    client.handshake().await?;
    let mut events = Vec::new();
    for _ in 0..4 {
        events.push(client.next_event().await.expect("event should arrive"));
    }
    assert_eq!(
        vec![
            Event::BtState(BtState::Discoverable),
            Event::BtState(BtState::Connecting),
            Event::BtState(BtState::Connected),
            Event::Metadata {
                kind: MetaKind::Artist,
                text: "Radiohead".to_string(),
            },
        ],
        events
    );

    client.send(Command::SetVolume(70)).await?;
    assert_eq!(Some(Event::Volume(70)), client.next_event().await);
    assert_eq!(
        Some(Event::Ack(Command::SetVolume(70).command_type())),
        client.next_event().await
    );

    client.close().await?;
    let summary = task.await??;
    assert_eq!(1, summary.sessions());
    assert_eq!(0, summary.suspends());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn deactivation_suspends_and_wakes_with_the_selected_mode() -> anyhow::Result<()> {
    let backend = FakeStackBackend::new(FakeStackConfig::builder().build());
    let (task, controller) = spawn_serve(backend, CancellationToken::new());
    let mut controller = RawController::new(controller);

    controller.send(Command::BtSetMode(Mode::Controller)).await;
    assert_eq!(
        vec![
            Event::Ack(Command::BtSetMode(Mode::Controller).command_type()),
            Event::BtMode(Mode::Controller),
        ],
        controller.read_events(2).await
    );

    controller.send(Command::BtDeactivate).await;
    assert_eq!(
        vec![Event::Ack(Command::BtDeactivate.command_type())],
        controller.read_events(1).await
    );

    sleep(Duration::from_secs(1)).await;
    // Consumed by the wake source, so never dispatched.
    controller.send(Command::BtActivate).await;
    sleep(Duration::from_secs(1)).await;

    controller.send(Command::BtGetMode).await;
    assert_eq!(
        vec![Event::BtMode(Mode::Controller)],
        controller.read_events(1).await
    );

    drop(controller);
    let summary = task.await??;
    assert_eq!(2, summary.sessions());
    assert_eq!(1, summary.suspends());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_radio_controller() -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let backend = FakeStackBackend::new(FakeStackConfig::builder().build());
    let (task, _controller) = spawn_serve(backend, cancel.clone());

    sleep(Duration::from_millis(250)).await;
    cancel.cancel();

    let summary = task.await??;
    assert_eq!(1, summary.sessions());
    Ok(())
}

#[tokio::test]
async fn bring_up_failure_is_reported() {
    let backend = FakeStackBackend::new(
        FakeStackConfig::builder()
            .init_failure(Profile::BleHid)
            .build(),
    );
    let (task, _controller) = spawn_serve(backend, CancellationToken::new());

    let result = task.await.expect("serve task should not panic");

    assert_matches!(result, Err(ProtocolError::Profile(_)));
}
