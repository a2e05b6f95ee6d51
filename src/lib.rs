mod app;
mod bonds;
mod bt;
mod cli;
mod coordinator;
mod error;
mod health;
mod link;
mod power;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    ServeConfig, ServeContext, ServeSummary, run, run_with_clients_and_log_level,
    run_with_log_level, serve,
};
pub use bonds::{BondRecord, BondStore, BondStoreError};
pub use bt::{
    AddressParseError, AudioSinkAdvertising, AudioSinkState, BdAddr, BleHidRadio, BleIdentity,
    BluetoothStack, ClassicRadio, ClassicVisibility, ConsumerUsage, FakeStackBackend,
    FakeStackConfig, MediaAttribute, MediaAttributeMask, NotificationCapabilities,
    NotificationKind, PassthroughKey, PeerNotification, Profile, ProfileError, StackBackend,
    StackCall, StackCallLog, StackEvent, StackEventSender, StackScript, metadata_from_avrcp,
    play_state_from_avrcp,
};
pub use cli::{
    Args, Command as CliCommand, FrameAction, FrameArgs, LinkTarget, LogLevel, OutputFormat,
    ProbeArgs, ServeArgs,
};
pub use coordinator::{
    CommandMapping, CommandOutcome, Coordinator, CoordinatorConfig, CoordinatorHandle,
    CoordinatorStatus, DEFAULT_BLE_NAME, DEFAULT_CLASSIC_NAME, DEFAULT_INITIAL_VOLUME,
    DEFAULT_KEY_SETTLE, DEFAULT_METADATA_POLL_INTERVAL, MediaKey, PeerProfile, TransitionError,
};
pub use error::{FixtureError, LinkError, ProtocolError};
pub use health::{DEFAULT_MISSED_PONG_THRESHOLD, HealthMonitor, HealthStatus};
pub use link::{
    BtState, ClientConfig, Command, CommandError, DEFAULT_HANDSHAKE_ATTEMPTS,
    DEFAULT_HANDSHAKE_INTERVAL, DEFAULT_HEARTBEAT_INTERVAL, DecoderStats, DispatchOutcome,
    Dispatcher, ErrorCode, Event, EventDecodeError, EventReceiver, EventSink, FRAME_DELIMITER,
    Frame, FrameCodec, FrameDecoder, FrameError, LinkClient, MAX_PAYLOAD_LEN, MAX_VOLUME,
    MetaKind, Mode, PlayState, ReceiveOutcome, run_receiver, run_writer,
};
pub use power::{
    DEFAULT_SUSPEND_SETTLE, DEFAULT_WAKE_EDGE_THRESHOLD, LinkActivityWake, PowerControl,
    WakeReason,
};
pub use protocol::{CommandType, EventType};
pub use terminal::TerminalClient;
