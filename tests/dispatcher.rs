use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;

use knob_link::{
    BondStore, CommandType, Coordinator, CoordinatorConfig, CoordinatorHandle, DispatchOutcome,
    Dispatcher, ErrorCode, Event, EventReceiver, EventSink, FakeStackBackend, FakeStackConfig,
    Mode, StackCall, StackCallLog,
};

struct Harness {
    coordinator: CoordinatorHandle,
    dispatcher: Dispatcher,
    events: EventReceiver,
    log: StackCallLog,
}

fn start(config: CoordinatorConfig) -> Harness {
    let log = StackCallLog::new();
    let backend = FakeStackBackend::new(FakeStackConfig::builder().call_log(log.clone()).build());
    let (sink, events) = EventSink::channel(64);
    let (coordinator, _task) = Coordinator::spawn(
        config,
        Arc::new(backend),
        sink.clone(),
        BondStore::in_memory(),
    )
    .expect("bring-up should succeed");
    let dispatcher = Dispatcher::new(coordinator.clone(), sink);
    Harness {
        coordinator,
        dispatcher,
        events,
        log,
    }
}

async fn dispatch(harness: &mut Harness, opcode: u8, payload: &[u8]) -> Vec<Event> {
    let outcome = harness
        .dispatcher
        .dispatch_raw(opcode, payload)
        .await
        .expect("dispatch should succeed");
    assert_eq!(DispatchOutcome::Continue, outcome);
    harness.events.drain()
}

fn error(code: ErrorCode) -> Event {
    Event::Error {
        code,
        message: code.message().to_string(),
    }
}

#[rstest]
#[case::unassigned(0x42)]
#[case::event_opcode(0x20)]
#[case::pong_opcode(0xF1)]
#[tokio::test]
async fn unknown_opcodes_are_reported(#[case] opcode: u8) {
    let mut harness = start(CoordinatorConfig::default());

    let events = dispatch(&mut harness, opcode, &[]).await;

    assert_eq!(vec![error(ErrorCode::UnknownCommand)], events);
}

#[rstest]
#[case::missing(&[])]
#[case::too_long(&[70, 71])]
#[tokio::test]
async fn malformed_set_volume_leaves_state_untouched(#[case] payload: &[u8]) {
    let mut harness = start(CoordinatorConfig::builder().initial_volume(40).build());

    let events = dispatch(&mut harness, CommandType::SetVolume.opcode(), payload).await;

    assert_eq!(vec![error(ErrorCode::InvalidPayload)], events);
    let status = harness
        .coordinator
        .status()
        .await
        .expect("status should be available");
    assert_eq!(40, status.volume());
}

#[tokio::test]
async fn ping_is_answered_with_pong_only() {
    let mut harness = start(CoordinatorConfig::default());

    let events = dispatch(&mut harness, CommandType::Ping.opcode(), &[]).await;

    assert_eq!(vec![Event::Pong], events);
}

#[tokio::test]
async fn trailing_bytes_on_parameterless_commands_are_ignored() {
    let mut harness = start(CoordinatorConfig::default());

    let events = dispatch(&mut harness, CommandType::Next.opcode(), &[0x01, 0x02]).await;

    assert_eq!(vec![Event::Ack(CommandType::Next)], events);
}

#[tokio::test]
async fn get_mode_answers_without_ack() {
    let mut harness = start(CoordinatorConfig::builder().mode(Mode::Controller).build());

    let events = dispatch(&mut harness, CommandType::BtGetMode.opcode(), &[]).await;

    assert_eq!(vec![Event::BtMode(Mode::Controller)], events);
}

#[tokio::test]
async fn set_mode_acknowledges_and_reports_the_new_mode() {
    let mut harness = start(CoordinatorConfig::default());

    let events = dispatch(
        &mut harness,
        CommandType::BtSetMode.opcode(),
        &[Mode::ControllerNoHack.wire_value()],
    )
    .await;

    assert_eq!(
        vec![
            Event::Ack(CommandType::BtSetMode),
            Event::BtMode(Mode::ControllerNoHack),
        ],
        events
    );
}

#[tokio::test]
async fn unknown_mode_values_are_invalid_payloads() {
    let mut harness = start(CoordinatorConfig::default());

    let events = dispatch(&mut harness, CommandType::BtSetMode.opcode(), &[0x07]).await;

    assert_eq!(vec![error(ErrorCode::InvalidPayload)], events);
    let status = harness
        .coordinator
        .status()
        .await
        .expect("status should be available");
    assert_eq!(Mode::Phone, status.mode());
}

#[tokio::test]
async fn play_without_a_peer_is_acknowledged_but_sends_nothing() {
    let mut harness = start(CoordinatorConfig::default());
    harness.log.clear();

    let events = dispatch(&mut harness, CommandType::Play.opcode(), &[]).await;

    assert_eq!(vec![Event::Ack(CommandType::Play)], events);
    assert_matches!(
        harness
            .log
            .snapshot()
            .iter()
            .find(|call| matches!(call, StackCall::BleKey { .. } | StackCall::Passthrough { .. })),
        None
    );
}

#[rstest]
#[case::play(CommandType::Play, &[])]
#[case::connect(CommandType::BtConnect, &[])]
#[case::pair_mode(CommandType::BtPairMode, &[])]
#[tokio::test]
async fn inactive_stack_rejects_radio_commands(
    #[case] command: CommandType,
    #[case] payload: &[u8],
) {
    let mut harness = start(CoordinatorConfig::builder().activate_on_start(false).build());

    let events = dispatch(&mut harness, command.opcode(), payload).await;

    assert_eq!(vec![error(ErrorCode::BluetoothInactive)], events);
}

#[tokio::test]
async fn activate_brings_the_stack_up() {
    let mut harness = start(CoordinatorConfig::builder().activate_on_start(false).build());

    let events = dispatch(&mut harness, CommandType::BtActivate.opcode(), &[]).await;

    assert_eq!(vec![Event::Ack(CommandType::BtActivate)], events);
    let status = harness
        .coordinator
        .status()
        .await
        .expect("status should be available");
    assert!(status.is_active());
}
