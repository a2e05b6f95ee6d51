//! Dual-mode Bluetooth coordinator.
//!
//! One task owns every piece of connection state. Link commands, stack
//! callbacks and timer expiries all arrive as [`CoordinatorMessage`]s on a
//! single bounded queue, so state changes are serialised without locks.

mod command_mapping;
mod state;
mod timers;

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

pub use command_mapping::{CommandMapping, MediaKey, PeerProfile};
pub use state::TransitionError;
pub(crate) use timers::TimerEvent;

use self::state::ConnectionState;
use self::timers::{KeyRelease, Timers};
use crate::bonds::BondStore;
use crate::bt::ble_hid::BleHidSurface;
use crate::bt::classic::{ClassicSurface, NotificationUpdate};
use crate::bt::{
    BdAddr, BleIdentity, ClassicVisibility, NotificationCapabilities, NotificationKind,
    ProfileError, StackBackend, StackEvent, StackEventSender, metadata_from_avrcp,
};
use crate::error::LinkError;
use crate::link::{
    BtState, Command, CommandError, ErrorCode, Event, EventSink, MAX_VOLUME, Mode, PlayState,
};
use crate::protocol::CommandType;

pub const DEFAULT_CLASSIC_NAME: &str = "Knob info";
pub const DEFAULT_BLE_NAME: &str = "Knob control";
pub const DEFAULT_METADATA_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_KEY_SETTLE: Duration = Duration::from_millis(50);
pub const DEFAULT_INITIAL_VOLUME: u8 = 64;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Coordinator settings.
#[derive(Debug, Clone, Builder)]
pub struct CoordinatorConfig {
    #[builder(default)]
    mode: Mode,
    #[builder(into, default = DEFAULT_CLASSIC_NAME.to_string())]
    classic_name: String,
    #[builder(into, default = DEFAULT_BLE_NAME.to_string())]
    ble_name: String,
    #[builder(default = DEFAULT_METADATA_POLL_INTERVAL)]
    metadata_poll_interval: Duration,
    /// Delay between the press and release halves of a key report.
    #[builder(default = DEFAULT_KEY_SETTLE)]
    key_settle: Duration,
    #[builder(default = DEFAULT_INITIAL_VOLUME)]
    initial_volume: u8,
    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
    /// Bring the stack up as soon as the coordinator starts.
    #[builder(default = true)]
    activate_on_start: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns a copy using `mode`.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Messages drained by the coordinator task.
#[derive(Debug)]
pub(crate) enum CoordinatorMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Stack(StackEvent),
    Timer(TimerEvent),
    Status(oneshot::Sender<CoordinatorStatus>),
    Shutdown,
}

/// How the link should answer a command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CommandOutcome {
    /// Acknowledge.
    Completed,
    /// Acknowledge, then send the event.
    CompletedWith(Event),
    /// Send the event instead of an acknowledgement.
    Answered(Event),
    /// Report the error instead of an acknowledgement.
    Rejected(CommandError),
    /// Acknowledge, flush and suspend.
    Deactivated,
}

/// Snapshot of coordinator state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CoordinatorStatus {
    active: bool,
    bt_state: BtState,
    play_state: PlayState,
    volume: u8,
    mode: Mode,
    hid_peer: Option<BdAddr>,
    classic_peer: Option<BdAddr>,
    classic_visibility: Option<ClassicVisibility>,
    capabilities: NotificationCapabilities,
}

impl CoordinatorStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn bt_state(&self) -> BtState {
        self.bt_state
    }

    #[must_use]
    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    /// Volume of record, `0..=127`.
    #[must_use]
    pub fn volume(&self) -> u8 {
        self.volume
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn hid_peer(&self) -> Option<BdAddr> {
        self.hid_peer
    }

    #[must_use]
    pub fn classic_peer(&self) -> Option<BdAddr> {
        self.classic_peer
    }

    /// `None` while the stack is down.
    #[must_use]
    pub fn classic_visibility(&self) -> Option<ClassicVisibility> {
        self.classic_visibility
    }

    #[must_use]
    pub fn capabilities(&self) -> NotificationCapabilities {
        self.capabilities
    }
}

/// Cloneable handle to a running coordinator.
///
/// The coordinator stops once every handle is dropped or after [`CoordinatorHandle::shutdown`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    queue: mpsc::Sender<CoordinatorMessage>,
}

impl CoordinatorHandle {
    /// Runs a command and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub async fn submit(&self, command: Command) -> Result<CommandOutcome, LinkError> {
        let (reply, outcome) = oneshot::channel();
        self.queue
            .send(CoordinatorMessage::Command { command, reply })
            .await
            .map_err(|_closed| LinkError::CoordinatorClosed)?;
        outcome.await.map_err(|_closed| LinkError::CoordinatorClosed)
    }

    /// Returns a snapshot of the coordinator state.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub async fn status(&self) -> Result<CoordinatorStatus, LinkError> {
        let (reply, status) = oneshot::channel();
        self.queue
            .send(CoordinatorMessage::Status(reply))
            .await
            .map_err(|_closed| LinkError::CoordinatorClosed)?;
        status.await.map_err(|_closed| LinkError::CoordinatorClosed)
    }

    /// Returns a sender for stack callbacks.
    #[must_use]
    pub fn stack_events(&self) -> StackEventSender {
        StackEventSender::new(self.queue.downgrade())
    }

    /// Tears the stack down and stops the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has already stopped.
    pub async fn shutdown(&self) -> Result<(), LinkError> {
        self.queue
            .send(CoordinatorMessage::Shutdown)
            .await
            .map_err(|_closed| LinkError::CoordinatorClosed)
    }
}

/// Link-visible state. Every change that the display controller should see
/// goes through here so events are emitted only on real changes.
struct LinkState {
    events: EventSink,
    connection: ConnectionState,
    play_state: PlayState,
    volume: u8,
    initial_volume: u8,
    mode: Mode,
}

impl LinkState {
    fn bt_state(&self) -> BtState {
        self.connection.current()
    }

    fn set_bt_state(&mut self, to: BtState) -> bool {
        match self.connection.transition(to) {
            Ok(true) => {
                info!(state = %to, "Bluetooth state changed");
                self.events.emit(Event::BtState(to));
                true
            }
            Ok(false) => false,
            Err(error) => {
                warn!(%error, "ignoring Bluetooth state change");
                false
            }
        }
    }

    fn set_play_state(&mut self, play_state: PlayState) {
        if self.play_state != play_state {
            info!(%play_state, "play state changed");
            self.play_state = play_state;
            self.events.emit(Event::PlayStatus(play_state));
        }
    }

    /// Clamps and stores `volume`, emitting only on change. Returns the stored value.
    fn set_volume(&mut self, volume: u8) -> u8 {
        let volume = volume.min(MAX_VOLUME);
        if self.volume != volume {
            info!(volume, "volume changed");
            self.volume = volume;
            self.events.emit(Event::Volume(volume));
        }
        volume
    }

    fn reset(&mut self) {
        self.connection.reset();
        self.play_state = PlayState::default();
        self.volume = self.initial_volume;
    }
}

/// One brought-up Bluetooth stack and the timers that belong to it.
struct Session {
    ble: BleHidSurface,
    classic: ClassicSurface,
    timers: Timers,
    mapping: CommandMapping,
}

impl Session {
    fn shutdown(self) {
        let Self {
            ble,
            classic,
            timers,
            mapping: _,
        } = self;
        drop(timers);
        ble.shutdown();
        classic.shutdown();
    }
}

/// Owner of Bluetooth and link state.
pub struct Coordinator {
    config: CoordinatorConfig,
    backend: Arc<dyn StackBackend>,
    bonds: BondStore,
    queue: mpsc::WeakSender<CoordinatorMessage>,
    link: LinkState,
    session: Option<Session>,
}

impl Coordinator {
    /// Starts the coordinator task, bringing the stack up first when configured to.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial bring-up fails; nothing is left running.
    pub fn spawn(
        config: CoordinatorConfig,
        backend: Arc<dyn StackBackend>,
        events: EventSink,
        bonds: BondStore,
    ) -> Result<(CoordinatorHandle, JoinHandle<()>), ProfileError> {
        let (queue, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let mut coordinator = Self {
            link: LinkState {
                events,
                connection: ConnectionState::default(),
                play_state: PlayState::default(),
                volume: config.initial_volume.min(MAX_VOLUME),
                initial_volume: config.initial_volume.min(MAX_VOLUME),
                mode: config.mode,
            },
            config,
            backend,
            bonds,
            queue: queue.downgrade(),
            session: None,
        };
        if coordinator.config.activate_on_start {
            coordinator.activate()?;
        }
        let task = tokio::spawn(coordinator.run(receiver));
        Ok((CoordinatorHandle { queue }, task))
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<CoordinatorMessage>) {
        while let Some(message) = receiver.recv().await {
            match message {
                CoordinatorMessage::Command { command, reply } => {
                    let outcome = self.handle_command(command);
                    if reply.send(outcome).is_err() {
                        debug!(?command, "command sender went away before the outcome");
                    }
                }
                CoordinatorMessage::Stack(event) => self.handle_stack_event(event),
                CoordinatorMessage::Timer(event) => self.handle_timer(event),
                CoordinatorMessage::Status(reply) => {
                    let _ = reply.send(self.status());
                }
                CoordinatorMessage::Shutdown => break,
            }
        }
        self.deactivate();
        debug!("coordinator stopped");
    }

    fn status(&self) -> CoordinatorStatus {
        let session = self.session.as_ref();
        CoordinatorStatus {
            active: session.is_some(),
            bt_state: self.link.bt_state(),
            play_state: self.link.play_state,
            volume: self.link.volume,
            mode: self.link.mode,
            hid_peer: session.and_then(|session| session.ble.peer()),
            classic_peer: session.and_then(|session| session.classic.peer()),
            classic_visibility: session.map(|session| session.classic.visibility()),
            capabilities: session.map_or(NotificationCapabilities::empty(), |session| {
                session.classic.capabilities()
            }),
        }
    }

    #[instrument(skip(self), level = "info", fields(mode = %self.link.mode))]
    fn activate(&mut self) -> Result<(), ProfileError> {
        if self.session.is_some() {
            debug!("Bluetooth already active");
            return Ok(());
        }

        let stack = self
            .backend
            .bring_up(StackEventSender::new(self.queue.clone()))?;
        let (ble_radio, classic_radio, audio_sink) = stack.into_parts();
        let profile = PeerProfile::for_mode(self.link.mode);
        let classic = ClassicSurface::start(
            classic_radio,
            audio_sink,
            &self.config.classic_name,
            profile.suppress_audio_sink,
        )?;
        let identity = BleIdentity::new(
            self.config.ble_name.clone(),
            classic.local_address().random_static(),
        );
        let ble = match BleHidSurface::start(ble_radio, &identity) {
            Ok(ble) => ble,
            Err(error) => {
                classic.shutdown();
                return Err(error);
            }
        };

        self.session = Some(Session {
            ble,
            classic,
            timers: Timers::new(self.queue.clone()),
            mapping: profile.mapping,
        });
        self.link.set_bt_state(BtState::Disconnected);
        info!(ble_address = %identity.address(), "Bluetooth active, Classic hidden until a HID peer connects");
        Ok(())
    }

    #[instrument(skip(self), level = "info")]
    fn deactivate(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
            info!("Bluetooth stopped");
        }
        self.link.set_bt_state(BtState::Disconnected);
        self.link.reset();
    }

    #[instrument(skip(self), level = "debug", fields(command = %command.command_type()))]
    fn handle_command(&mut self, command: Command) -> CommandOutcome {
        match self.run_command(command) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, "command failed");
                if matches!(error, CommandError::ProfileFailure { .. }) {
                    self.fall_back_to_discoverable();
                }
                CommandOutcome::Rejected(error)
            }
        }
    }

    fn run_command(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        let command_type = command.command_type();
        let failed = |source: ProfileError| CommandError::ProfileFailure {
            command: command_type,
            source,
        };

        match command {
            Command::Play => self.send_key(command_type, MediaKey::Play)?,
            Command::Pause => self.send_key(command_type, MediaKey::Pause)?,
            Command::PlayPause => self.send_key(command_type, MediaKey::PlayPause)?,
            Command::Next => self.send_key(command_type, MediaKey::Next)?,
            Command::Prev => self.send_key(command_type, MediaKey::Prev)?,
            Command::VolUp => self.send_key(command_type, MediaKey::VolumeUp)?,
            Command::VolDown => self.send_key(command_type, MediaKey::VolumeDown)?,
            Command::SetVolume(requested) => self.set_volume(requested).map_err(failed)?,
            Command::BtConnect => {
                let session = active_session(&mut self.session, command_type)?;
                reconnect_last_peer(session, &mut self.link, &self.bonds).map_err(failed)?;
            }
            Command::BtDisconnect => {
                let session = active_session(&mut self.session, command_type)?;
                if matches!(
                    self.link.bt_state(),
                    BtState::Connected | BtState::Connecting
                ) {
                    session.classic.disconnect().map_err(failed)?;
                } else {
                    debug!(state = %self.link.bt_state(), "nothing to disconnect");
                }
            }
            Command::BtPairMode => {
                let session = active_session(&mut self.session, command_type)?;
                session.ble.restart_advertising().map_err(failed)?;
                if !make_classic_discoverable(session, &mut self.link).map_err(failed)? {
                    info!("pairing deferred until the first HID peer connects");
                }
            }
            Command::BtActivate => self.activate().map_err(failed)?,
            Command::BtDeactivate => {
                self.deactivate();
                return Ok(CommandOutcome::Deactivated);
            }
            Command::BtSetMode(mode) => {
                info!(%mode, "Bluetooth mode set, applies from the next connection");
                self.link.mode = mode;
                return Ok(CommandOutcome::CompletedWith(Event::BtMode(mode)));
            }
            Command::BtGetMode => {
                return Ok(CommandOutcome::Answered(Event::BtMode(self.link.mode)));
            }
            Command::Ping => return Ok(CommandOutcome::Answered(Event::Pong)),
        }
        Ok(CommandOutcome::Completed)
    }

    /// Sends the press half of a key and schedules the release.
    ///
    /// HID is preferred whenever a HID peer is connected; AVRCP pass-through is
    /// the fallback for a Classic-only peer.
    fn send_key(&mut self, command: CommandType, key: MediaKey) -> Result<(), CommandError> {
        let settle = self.config.key_settle;
        let play_state = self.link.play_state;
        let bt_state = self.link.bt_state();
        let session = active_session(&mut self.session, command)?;
        let failed = |source: ProfileError| CommandError::ProfileFailure { command, source };

        if session.ble.is_connected() {
            let usage = session.mapping.usage_for(key);
            debug!(%key, %usage, "sending HID key");
            session.ble.press(usage).map_err(failed)?;
            session
                .timers
                .schedule_release(settle, KeyRelease::Hid(usage));
        } else if bt_state == BtState::Connected {
            let passthrough = key.passthrough_key(play_state);
            debug!(%key, %passthrough, "sending AVRCP pass-through");
            let label = session.classic.press(passthrough).map_err(failed)?;
            session.timers.schedule_release(
                settle,
                KeyRelease::Passthrough {
                    label,
                    key: passthrough,
                },
            );
        } else {
            warn!(%key, "no connected peer, key dropped");
        }
        Ok(())
    }

    /// Applies a requested volume. The peer is asked to follow only while connected.
    fn set_volume(&mut self, requested: u8) -> Result<(), ProfileError> {
        let volume = self.link.set_volume(requested);
        if self.link.bt_state() != BtState::Connected {
            debug!(volume, "not connected, volume stored locally");
            return Ok(());
        }
        if let Some(session) = self.session.as_mut() {
            session.classic.set_absolute_volume(volume)?;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn handle_stack_event(&mut self, event: StackEvent) {
        if self.session.is_none() {
            debug!(?event, "stack inactive, ignoring callback");
            return;
        }
        if let Err(error) = self.apply_stack_event(event) {
            self.report_profile_failure(&error);
        }
    }

    fn apply_stack_event(&mut self, event: StackEvent) -> Result<(), ProfileError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let link = &mut self.link;

        match event {
            StackEvent::BleHidConnected { peer } => {
                let first = session.ble.on_connected(peer);
                session.mapping = PeerProfile::for_mode(link.mode).mapping;
                info!(%peer, first, "HID peer connected");
                if let Err(error) = self.bonds.record_ble_hid(peer) {
                    warn!(%error, "failed to persist HID bond");
                }
                if link.bt_state() == BtState::Connected {
                    debug!("Classic peer already connected");
                    return Ok(());
                }
                make_classic_discoverable(session, link)?;
            }
            StackEvent::BleHidDisconnected => {
                info!("HID peer disconnected, advertising again");
                session.ble.on_disconnected()?;
            }
            StackEvent::ClassicAuthenticated { device_name } => {
                info!(%device_name, "Classic peer authenticated");
                link.events.emit(Event::DeviceName(device_name));
            }
            StackEvent::AclConnected { peer } => debug!(%peer, "ACL connected"),
            StackEvent::AclDisconnected => {
                info!("ACL disconnected");
                session.timers.stop_metadata_poll();
                session.classic.on_avrcp_disconnected();
                link.set_bt_state(BtState::Disconnected);
                make_classic_discoverable(session, link)?;
            }
            StackEvent::AvrcpConnected { peer } => {
                if link.bt_state() == BtState::Discoverable {
                    link.set_bt_state(BtState::Connecting);
                }
                if !link.set_bt_state(BtState::Connected) {
                    warn!(%peer, state = %link.bt_state(), "unexpected AVRCP connection");
                    return Ok(());
                }
                info!(%peer, "AVRCP connected");
                session
                    .timers
                    .start_metadata_poll(self.config.metadata_poll_interval);
                if let Err(error) = self.bonds.record_classic(peer) {
                    warn!(%error, "failed to persist Classic bond");
                }
                session.ble.advertise_towards(peer)?;
                session.classic.on_avrcp_connected(peer)?;
            }
            StackEvent::AvrcpDisconnected => {
                info!("AVRCP disconnected");
                session.timers.stop_metadata_poll();
                session.classic.on_avrcp_disconnected();
                link.set_bt_state(BtState::Disconnected);
                make_classic_discoverable(session, link)?;
            }
            StackEvent::CapabilitiesReceived(capabilities) => {
                session.classic.on_capabilities(capabilities)?;
            }
            StackEvent::MetadataReceived { attribute, text } => {
                match metadata_from_avrcp(attribute, &text) {
                    Some((kind, text)) => {
                        debug!(%kind, %text, "metadata received");
                        link.events.emit(Event::Metadata { kind, text });
                    }
                    None => warn!(
                        attribute = format_args!("{attribute:#04x}"),
                        "unknown metadata attribute"
                    ),
                }
            }
            StackEvent::Notification(notification) => {
                match session.classic.on_notification(notification)? {
                    NotificationUpdate::TrackChanged => debug!("track changed"),
                    NotificationUpdate::PlayState(play_state) => link.set_play_state(play_state),
                    NotificationUpdate::Volume(volume) => {
                        link.set_volume(volume);
                    }
                    NotificationUpdate::Position(position_ms) => {
                        trace!(position_ms, "play position");
                        link.events.emit(Event::Position(position_ms));
                    }
                }
            }
            StackEvent::AbsoluteVolumeResponse { volume }
            | StackEvent::TargetSetAbsoluteVolume { volume } => {
                link.set_volume(volume);
            }
            StackEvent::TargetRegisterNotification { kind } => {
                if kind == NotificationKind::Volume {
                    let volume = link.volume;
                    debug!(volume, "peer registered for volume changes");
                    session.classic.respond_volume_interim(volume)?;
                    link.events.emit(Event::Volume(volume));
                } else {
                    debug!(%kind, "ignoring target registration");
                }
            }
            StackEvent::AudioSinkState(state) => {
                info!(%state, "audio sink state changed, audio is discarded");
            }
            StackEvent::AudioData { len } => trace!(len, "discarding audio data"),
            StackEvent::ProfileFailure(error) => return Err(error),
        }
        Ok(())
    }

    fn handle_timer(&mut self, event: TimerEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = match event {
            TimerEvent::MetadataPoll => {
                if self.link.bt_state() == BtState::Connected {
                    session.classic.request_metadata()
                } else {
                    Ok(())
                }
            }
            TimerEvent::Release(KeyRelease::Hid(usage)) => session.ble.release(usage),
            TimerEvent::Release(KeyRelease::Passthrough { label, key }) => {
                session.classic.release(label, key)
            }
        };
        if let Err(error) = result {
            self.report_profile_failure(&error);
        }
    }

    /// Reports a stack failure to the display controller and lets the state
    /// machine fall back so advertising retries.
    fn report_profile_failure(&mut self, error: &ProfileError) {
        warn!(%error, "Bluetooth profile failure");
        self.link.events.emit(Event::Error {
            code: ErrorCode::ProfileFailure,
            message: error.to_string(),
        });
        self.fall_back_to_discoverable();
    }

    fn fall_back_to_discoverable(&mut self) {
        if self.link.bt_state() != BtState::Connecting {
            return;
        }
        self.link.set_bt_state(BtState::Disconnected);
        if let Some(session) = self.session.as_mut()
            && let Err(error) = make_classic_discoverable(session, &mut self.link)
        {
            warn!(%error, "failed to make Classic discoverable again");
        }
    }
}

fn active_session(
    session: &mut Option<Session>,
    command: CommandType,
) -> Result<&mut Session, CommandError> {
    session
        .as_mut()
        .ok_or(CommandError::BluetoothInactive { command })
}

/// Makes Classic connectable and discoverable, but only once a HID peer has
/// connected this session. Returns whether the radio is now discoverable.
fn make_classic_discoverable(
    session: &mut Session,
    link: &mut LinkState,
) -> Result<bool, ProfileError> {
    if !session.ble.has_connected_once() {
        debug!("Classic stays hidden until a HID peer connects");
        return Ok(false);
    }
    session
        .classic
        .set_visibility(ClassicVisibility::Discoverable)?;
    if link.bt_state() == BtState::Disconnected {
        link.set_bt_state(BtState::Discoverable);
    }
    Ok(true)
}

fn reconnect_last_peer(
    session: &mut Session,
    link: &mut LinkState,
    bonds: &BondStore,
) -> Result<(), ProfileError> {
    if link.bt_state() != BtState::Discoverable {
        info!(state = %link.bt_state(), "reconnect only starts from discoverable");
        return Ok(());
    }
    let Some(peer) = bonds.last_classic_peer() else {
        warn!("no bonded Classic peer to reconnect to");
        return Ok(());
    };
    info!(%peer, "reconnecting to last Classic peer");
    link.set_bt_state(BtState::Connecting);
    session.classic.connect(peer)
}
