use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bon::Builder;
use tokio::time::sleep;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use super::address::BdAddr;
use super::ble_hid::ConsumerUsage;
use super::classic::{MediaAttributeMask, NotificationCapabilities, NotificationKind, PassthroughKey};
use super::stack::{
    AudioSinkAdvertising, AudioSinkState, BleHidRadio, BleIdentity, BluetoothStack, ClassicRadio,
    ClassicVisibility, PeerNotification, Profile, ProfileError, StackBackend, StackEvent,
    StackEventSender,
};
use crate::error::FixtureError;

const DEFAULT_LOCAL_ADDRESS: BdAddr = BdAddr::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);

/// One call made into the simulated stack, or one scripted callback delivered by it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StackCall {
    BleStart { name: String, address: BdAddr },
    BleAdvertise { peer_hint: Option<BdAddr> },
    BleKey { usage: ConsumerUsage, pressed: bool },
    BleStop,
    ClassicStart { device_name: String },
    SetVisibility(ClassicVisibility),
    Connect(BdAddr),
    Disconnect,
    RequestCapabilities,
    RequestMetadata(MediaAttributeMask),
    RegisterNotification(NotificationKind),
    Passthrough {
        label: u8,
        key: PassthroughKey,
        pressed: bool,
    },
    SetAbsoluteVolume(u8),
    RespondVolumeInterim(u8),
    ClassicStop,
    SuppressAudioSink,
    /// A scripted callback handed to the coordinator.
    Delivered(StackEvent),
}

/// Shared, append-only record of [`StackCall`]s.
#[derive(Debug, Clone, Default)]
pub struct StackCallLog {
    calls: Arc<Mutex<Vec<StackCall>>>,
}

impl StackCallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StackCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: StackCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct ScriptStep {
    delay: Duration,
    event: StackEvent,
}

/// Timed sequence of stack callbacks replayed after every bring-up.
///
/// Steps are separated by `;` and have the form `delay|event[|argument...]`,
/// where each delay is relative to the previous step:
///
/// ```
/// use knob_link::StackScript;
///
/// let script: StackScript =
///     "0ms|ble-connect|AA:BB:CC:DD:EE:01;200ms|avrcp-connect|AA:BB:CC:DD:EE:02".parse()?;
/// assert_eq!(2, script.len());
/// # Ok::<(), knob_link::FixtureError>(())
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StackScript {
    steps: Vec<ScriptStep>,
}

impl StackScript {
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromStr for StackScript {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        let steps = value
            .split(';')
            .filter(|raw_step| !raw_step.trim().is_empty())
            .map(parse_step)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }
}

fn parse_step(raw_step: &str) -> Result<ScriptStep, FixtureError> {
    let fields: Vec<&str> = raw_step.split('|').map(str::trim).collect();
    let [raw_delay, name, arguments @ ..] = fields.as_slice() else {
        return Err(FixtureError::InvalidStepFieldCount);
    };
    if raw_delay.is_empty() || name.is_empty() {
        return Err(FixtureError::EmptyStepField);
    }
    let delay = humantime::parse_duration(raw_delay).map_err(|_error| FixtureError::InvalidDelay {
        value: (*raw_delay).to_string(),
    })?;
    let event = parse_event(name, arguments)?;
    Ok(ScriptStep { delay, event })
}

fn parse_event(name: &str, arguments: &[&str]) -> Result<StackEvent, FixtureError> {
    let expect = |expected: usize| {
        if arguments.len() == expected {
            Ok(())
        } else {
            Err(FixtureError::InvalidArgumentCount {
                name: name.to_string(),
                expected,
            })
        }
    };

    let event = match name {
        "ble-connect" => {
            expect(1)?;
            StackEvent::BleHidConnected {
                peer: parse_address(arguments[0])?,
            }
        }
        "ble-disconnect" => {
            expect(0)?;
            StackEvent::BleHidDisconnected
        }
        "auth" => {
            expect(1)?;
            StackEvent::ClassicAuthenticated {
                device_name: arguments[0].to_string(),
            }
        }
        "acl-connect" => {
            expect(1)?;
            StackEvent::AclConnected {
                peer: parse_address(arguments[0])?,
            }
        }
        "acl-disconnect" => {
            expect(0)?;
            StackEvent::AclDisconnected
        }
        "avrcp-connect" => {
            expect(1)?;
            StackEvent::AvrcpConnected {
                peer: parse_address(arguments[0])?,
            }
        }
        "avrcp-disconnect" => {
            expect(0)?;
            StackEvent::AvrcpDisconnected
        }
        "caps" => {
            expect(1)?;
            StackEvent::CapabilitiesReceived(parse_capabilities(arguments[0])?)
        }
        "meta" => {
            expect(2)?;
            StackEvent::MetadataReceived {
                attribute: parse_number(arguments[0])?,
                text: arguments[1].to_string(),
            }
        }
        "track-changed" => {
            expect(0)?;
            StackEvent::Notification(PeerNotification::TrackChanged)
        }
        "play-status" => {
            expect(1)?;
            StackEvent::Notification(PeerNotification::PlayStatusChanged(parse_number(
                arguments[0],
            )?))
        }
        "volume" => {
            expect(1)?;
            StackEvent::Notification(PeerNotification::VolumeChanged(parse_number(
                arguments[0],
            )?))
        }
        "position" => {
            expect(1)?;
            StackEvent::Notification(PeerNotification::PlayPositionChanged(parse_number(
                arguments[0],
            )?))
        }
        "volume-response" => {
            expect(1)?;
            StackEvent::AbsoluteVolumeResponse {
                volume: parse_number(arguments[0])?,
            }
        }
        "target-volume" => {
            expect(1)?;
            StackEvent::TargetSetAbsoluteVolume {
                volume: parse_number(arguments[0])?,
            }
        }
        "target-register" => {
            expect(1)?;
            StackEvent::TargetRegisterNotification {
                kind: parse_kind(arguments[0])?,
            }
        }
        "a2dp" => {
            expect(1)?;
            let state = match arguments[0] {
                "connecting" => AudioSinkState::Connecting,
                "connected" => AudioSinkState::Connected,
                "disconnected" => AudioSinkState::Disconnected,
                other => {
                    return Err(FixtureError::UnknownAudioSinkState {
                        value: other.to_string(),
                    });
                }
            };
            StackEvent::AudioSinkState(state)
        }
        "audio" => {
            expect(1)?;
            StackEvent::AudioData {
                len: parse_number(arguments[0])?,
            }
        }
        "pairing-failed" => {
            expect(1)?;
            StackEvent::ProfileFailure(ProfileError::Pairing {
                profile: Profile::Gap,
                status: parse_number(arguments[0])?,
            })
        }
        other => {
            return Err(FixtureError::UnknownEvent {
                name: other.to_string(),
            });
        }
    };
    Ok(event)
}

fn parse_address(value: &str) -> Result<BdAddr, FixtureError> {
    value.parse().map_err(|_error| FixtureError::InvalidAddress {
        value: value.to_string(),
    })
}

fn parse_number<T>(value: &str) -> Result<T, FixtureError>
where
    T: FromStr + TryFrom<u64>,
{
    let invalid = || FixtureError::InvalidNumber {
        value: value.to_string(),
    };
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex_digits) => {
            let wide = u64::from_str_radix(hex_digits, 16).map_err(|_error| invalid())?;
            T::try_from(wide).map_err(|_error| invalid())
        }
        None => value.parse().map_err(|_error| invalid()),
    }
}

fn parse_kind(value: &str) -> Result<NotificationKind, FixtureError> {
    value
        .parse()
        .map_err(|_error| FixtureError::UnknownNotificationKind {
            value: value.to_string(),
        })
}

/// `-` is the empty set; otherwise a comma-separated list of notification kinds.
fn parse_capabilities(value: &str) -> Result<NotificationCapabilities, FixtureError> {
    if value == "-" {
        return Ok(NotificationCapabilities::empty());
    }
    value
        .split(',')
        .map(str::trim)
        .map(parse_kind)
        .try_fold(NotificationCapabilities::empty(), |caps, kind| {
            Ok(caps.with(kind?))
        })
}

/// Settings for the simulated Bluetooth stack.
#[derive(Debug, Clone, Builder)]
pub struct FakeStackConfig {
    #[builder(default)]
    script: StackScript,
    #[builder(default = DEFAULT_LOCAL_ADDRESS)]
    local_address: BdAddr,
    /// Profile whose initialisation fails at bring-up.
    init_failure: Option<Profile>,
    #[builder(default)]
    call_log: StackCallLog,
}

/// Bluetooth stack double that records calls and replays a [`StackScript`].
#[derive(Debug)]
pub struct FakeStackBackend {
    config: FakeStackConfig,
}

impl FakeStackBackend {
    #[must_use]
    pub fn new(config: FakeStackConfig) -> Self {
        Self { config }
    }

    /// Returns the shared call log.
    #[must_use]
    pub fn call_log(&self) -> StackCallLog {
        self.config.call_log.clone()
    }
}

impl StackBackend for FakeStackBackend {
    fn bring_up(&self, events: StackEventSender) -> Result<BluetoothStack, ProfileError> {
        let log = self.config.call_log.clone();
        let cancel = CancellationToken::new();
        if !self.config.script.is_empty() {
            tokio::spawn(play_script(
                self.config.script.steps.clone(),
                events,
                log.clone(),
                cancel.clone(),
            ));
        }

        let fails = |profile: Profile| self.config.init_failure == Some(profile);
        Ok(BluetoothStack::new(
            Box::new(FakeBleHid {
                log: log.clone(),
                fail_start: fails(Profile::BleHid),
            }),
            Box::new(FakeClassic {
                log: log.clone(),
                local_address: self.config.local_address,
                fail_start: fails(Profile::Avrcp),
                _script: cancel.drop_guard(),
            }),
            Box::new(FakeAudioSink {
                log,
                fail_suppress: fails(Profile::AudioSink),
            }),
        ))
    }
}

async fn play_script(
    steps: Vec<ScriptStep>,
    events: StackEventSender,
    log: StackCallLog,
    cancel: CancellationToken,
) {
    for step in steps {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = sleep(step.delay) => {}
        }
        log.record(StackCall::Delivered(step.event.clone()));
        if let Err(error) = events.send(step.event).await {
            debug!(%error, "script stopped");
            return;
        }
    }
}

fn simulated_init_failure(profile: Profile) -> ProfileError {
    ProfileError::Init {
        profile,
        reason: "simulated initialisation failure".to_string(),
    }
}

struct FakeBleHid {
    log: StackCallLog,
    fail_start: bool,
}

impl BleHidRadio for FakeBleHid {
    fn start(&mut self, identity: &BleIdentity) -> Result<(), ProfileError> {
        if self.fail_start {
            return Err(simulated_init_failure(Profile::BleHid));
        }
        self.log.record(StackCall::BleStart {
            name: identity.name().to_string(),
            address: identity.address(),
        });
        Ok(())
    }

    fn start_advertising(&mut self, peer_hint: Option<BdAddr>) -> Result<(), ProfileError> {
        self.log.record(StackCall::BleAdvertise { peer_hint });
        Ok(())
    }

    fn send_consumer_key(
        &mut self,
        usage: ConsumerUsage,
        pressed: bool,
    ) -> Result<(), ProfileError> {
        self.log.record(StackCall::BleKey { usage, pressed });
        Ok(())
    }

    fn stop(&mut self) {
        self.log.record(StackCall::BleStop);
    }
}

struct FakeClassic {
    log: StackCallLog,
    local_address: BdAddr,
    fail_start: bool,
    /// Stops the script when the radio goes away.
    _script: DropGuard,
}

impl ClassicRadio for FakeClassic {
    fn local_address(&self) -> BdAddr {
        self.local_address
    }

    fn start(&mut self, device_name: &str) -> Result<(), ProfileError> {
        if self.fail_start {
            return Err(simulated_init_failure(Profile::Avrcp));
        }
        self.log.record(StackCall::ClassicStart {
            device_name: device_name.to_string(),
        });
        Ok(())
    }

    fn set_visibility(&mut self, visibility: ClassicVisibility) -> Result<(), ProfileError> {
        self.log.record(StackCall::SetVisibility(visibility));
        Ok(())
    }

    fn connect(&mut self, peer: BdAddr) -> Result<(), ProfileError> {
        self.log.record(StackCall::Connect(peer));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ProfileError> {
        self.log.record(StackCall::Disconnect);
        Ok(())
    }

    fn request_capabilities(&mut self, _label: u8) -> Result<(), ProfileError> {
        self.log.record(StackCall::RequestCapabilities);
        Ok(())
    }

    fn request_metadata(
        &mut self,
        _label: u8,
        attributes: MediaAttributeMask,
    ) -> Result<(), ProfileError> {
        self.log.record(StackCall::RequestMetadata(attributes));
        Ok(())
    }

    fn register_notification(
        &mut self,
        _label: u8,
        kind: NotificationKind,
        _interval_secs: u32,
    ) -> Result<(), ProfileError> {
        self.log.record(StackCall::RegisterNotification(kind));
        Ok(())
    }

    fn send_passthrough(
        &mut self,
        label: u8,
        key: PassthroughKey,
        pressed: bool,
    ) -> Result<(), ProfileError> {
        self.log.record(StackCall::Passthrough {
            label,
            key,
            pressed,
        });
        Ok(())
    }

    fn set_absolute_volume(&mut self, _label: u8, volume: u8) -> Result<(), ProfileError> {
        self.log.record(StackCall::SetAbsoluteVolume(volume));
        Ok(())
    }

    fn respond_volume_interim(&mut self, volume: u8) -> Result<(), ProfileError> {
        self.log.record(StackCall::RespondVolumeInterim(volume));
        Ok(())
    }

    fn stop(&mut self) {
        self.log.record(StackCall::ClassicStop);
    }
}

struct FakeAudioSink {
    log: StackCallLog,
    fail_suppress: bool,
}

impl AudioSinkAdvertising for FakeAudioSink {
    fn suppress_after_init(&mut self) -> Result<(), ProfileError> {
        if self.fail_suppress {
            return Err(simulated_init_failure(Profile::AudioSink));
        }
        self.log.record(StackCall::SuppressAudioSink);
        Ok(())
    }
}
