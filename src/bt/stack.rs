use std::fmt;

use serde::Serialize;
use serde_with::SerializeDisplay;
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use super::address::BdAddr;
use super::ble_hid::ConsumerUsage;
use super::classic::{MediaAttributeMask, NotificationCapabilities, NotificationKind, PassthroughKey};
use crate::coordinator::CoordinatorMessage;
use crate::error::LinkError;

/// Bluetooth profile named in failures.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum Profile {
    BleHid,
    Avrcp,
    AudioSink,
    Gap,
}

/// Failures reported by a Bluetooth stack binding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ProfileError {
    #[error("{profile} initialisation failed: {reason}")]
    Init { profile: Profile, reason: String },
    #[error("{profile} rejected `{operation}`: {reason}")]
    Request {
        profile: Profile,
        operation: &'static str,
        reason: String,
    },
    #[error("{profile} pairing failed with status {status:#04x}")]
    Pairing { profile: Profile, status: u8 },
    #[error("the Bluetooth stack is not active")]
    Inactive,
}

impl ProfileError {
    /// Returns the profile the failure belongs to, if any.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        match self {
            Self::Init { profile, .. }
            | Self::Request { profile, .. }
            | Self::Pairing { profile, .. } => Some(*profile),
            Self::Inactive => None,
        }
    }
}

/// Classic radio scan mode. The coordinator is the only caller allowed to change it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClassicVisibility {
    /// Non-connectable and non-discoverable.
    Hidden,
    /// Connectable and generally discoverable.
    Discoverable,
}

/// Name and address advertised by the LE HID identity.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BleIdentity {
    name: String,
    address: BdAddr,
}

impl BleIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, address: BdAddr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn address(&self) -> BdAddr {
        self.address
    }
}

/// LE HID radio binding.
///
/// Requests are handed to the stack and complete asynchronously; outcomes
/// arrive as [`StackEvent`]s.
pub trait BleHidRadio: Send {
    /// Registers the HID service, applies the identity and starts advertising.
    fn start(&mut self, identity: &BleIdentity) -> Result<(), ProfileError>;

    /// (Re)starts undirected advertising. `peer_hint` names the peer we expect.
    fn start_advertising(&mut self, peer_hint: Option<BdAddr>) -> Result<(), ProfileError>;

    /// Sends one consumer-control report edge.
    fn send_consumer_key(&mut self, usage: ConsumerUsage, pressed: bool)
    -> Result<(), ProfileError>;

    fn stop(&mut self);
}

/// Classic radio binding covering GAP, the AVRCP controller and target roles.
pub trait ClassicRadio: Send {
    /// Base address of the controller.
    fn local_address(&self) -> BdAddr;

    /// Initialises the AVRCP roles and the audio sink, leaving the radio hidden.
    fn start(&mut self, device_name: &str) -> Result<(), ProfileError>;

    fn set_visibility(&mut self, visibility: ClassicVisibility) -> Result<(), ProfileError>;

    fn connect(&mut self, peer: BdAddr) -> Result<(), ProfileError>;

    fn disconnect(&mut self) -> Result<(), ProfileError>;

    fn request_capabilities(&mut self, label: u8) -> Result<(), ProfileError>;

    fn request_metadata(
        &mut self,
        label: u8,
        attributes: MediaAttributeMask,
    ) -> Result<(), ProfileError>;

    fn register_notification(
        &mut self,
        label: u8,
        kind: NotificationKind,
        interval_secs: u32,
    ) -> Result<(), ProfileError>;

    fn send_passthrough(
        &mut self,
        label: u8,
        key: PassthroughKey,
        pressed: bool,
    ) -> Result<(), ProfileError>;

    fn set_absolute_volume(&mut self, label: u8, volume: u8) -> Result<(), ProfileError>;

    /// Answers a peer's volume-change registration with the current volume (target role).
    fn respond_volume_interim(&mut self, volume: u8) -> Result<(), ProfileError>;

    fn stop(&mut self);
}

/// Control over the audio-sink service-discovery record.
///
/// Some peers only connect AVRCP when an audio sink is advertised, so the sink
/// profile is initialised and its record then withdrawn.
pub trait AudioSinkAdvertising: Send {
    /// Withdraws the sink's service record while keeping the profile initialised.
    fn suppress_after_init(&mut self) -> Result<(), ProfileError>;
}

/// One freshly brought-up set of radio bindings.
pub struct BluetoothStack {
    ble: Box<dyn BleHidRadio>,
    classic: Box<dyn ClassicRadio>,
    audio_sink: Box<dyn AudioSinkAdvertising>,
}

impl BluetoothStack {
    #[must_use]
    pub fn new(
        ble: Box<dyn BleHidRadio>,
        classic: Box<dyn ClassicRadio>,
        audio_sink: Box<dyn AudioSinkAdvertising>,
    ) -> Self {
        Self {
            ble,
            classic,
            audio_sink,
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Box<dyn BleHidRadio>,
        Box<dyn ClassicRadio>,
        Box<dyn AudioSinkAdvertising>,
    ) {
        (self.ble, self.classic, self.audio_sink)
    }
}

impl fmt::Debug for BluetoothStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BluetoothStack").finish_non_exhaustive()
    }
}

/// Builds Bluetooth stacks; called once per activation.
pub trait StackBackend: Send + Sync {
    /// Brings the controller up and wires its callbacks to `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller or a profile cannot be initialised.
    fn bring_up(&self, events: StackEventSender) -> Result<BluetoothStack, ProfileError>;
}

/// AVRCP change notification delivered by the peer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PeerNotification {
    TrackChanged,
    /// Raw AVRCP playback status.
    PlayStatusChanged(u8),
    VolumeChanged(u8),
    PlayPositionChanged(u32),
}

/// Audio-sink connection state, reported for diagnostics only.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AudioSinkState {
    Connecting,
    Connected,
    Disconnected,
}

/// Callback delivered by the Bluetooth stack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StackEvent {
    BleHidConnected { peer: BdAddr },
    BleHidDisconnected,
    ClassicAuthenticated { device_name: String },
    AclConnected { peer: BdAddr },
    AclDisconnected,
    AvrcpConnected { peer: BdAddr },
    AvrcpDisconnected,
    CapabilitiesReceived(NotificationCapabilities),
    /// Raw AVRCP attribute id and text.
    MetadataReceived { attribute: u8, text: String },
    Notification(PeerNotification),
    AbsoluteVolumeResponse { volume: u8 },
    /// The peer set our volume through the target role.
    TargetSetAbsoluteVolume { volume: u8 },
    /// The peer registered for a notification from our target role.
    TargetRegisterNotification { kind: NotificationKind },
    AudioSinkState(AudioSinkState),
    AudioData { len: usize },
    ProfileFailure(ProfileError),
}

/// Cloneable handle used by stack bindings to deliver callbacks to the coordinator.
///
/// Holds no strong reference to the coordinator queue, so a stack binding never
/// keeps a stopped coordinator alive.
#[derive(Debug, Clone)]
pub struct StackEventSender {
    queue: mpsc::WeakSender<CoordinatorMessage>,
}

impl StackEventSender {
    pub(crate) fn new(queue: mpsc::WeakSender<CoordinatorMessage>) -> Self {
        Self { queue }
    }

    /// Delivers an event, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub async fn send(&self, event: StackEvent) -> Result<(), LinkError> {
        let queue = self.queue.upgrade().ok_or(LinkError::CoordinatorClosed)?;
        queue
            .send(CoordinatorMessage::Stack(event))
            .await
            .map_err(|_closed| LinkError::CoordinatorClosed)
    }

    /// Delivers an event from a non-async callback context, dropping it when the
    /// queue is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub fn post(&self, event: StackEvent) -> Result<(), LinkError> {
        let queue = self.queue.upgrade().ok_or(LinkError::CoordinatorClosed)?;
        match queue.try_send(CoordinatorMessage::Stack(event)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                warn!(?message, "coordinator queue full, dropping stack event");
                Ok(())
            }
            Err(TrySendError::Closed(_message)) => Err(LinkError::CoordinatorClosed),
        }
    }
}
