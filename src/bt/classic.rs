use serde_with::SerializeDisplay;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info, instrument, warn};

use super::address::BdAddr;
use super::stack::{
    AudioSinkAdvertising, ClassicRadio, ClassicVisibility, PeerNotification, ProfileError,
};
use crate::link::{MetaKind, PlayState};

pub(crate) const LABEL_CAPABILITIES: u8 = 0;
pub(crate) const LABEL_METADATA: u8 = 1;
pub(crate) const LABEL_SET_VOLUME: u8 = 5;

/// Transaction labels wrap at 16.
const LABEL_MODULUS: u8 = 16;

const POSITION_INTERVAL_SECS: u32 = 1;

/// AVRCP change notifications this device subscribes to.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, EnumString, SerializeDisplay,
)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Track,
    PlayStatus,
    Volume,
    Position,
}

impl NotificationKind {
    /// Returns the AVRCP event id.
    #[must_use]
    pub const fn event_id(self) -> u8 {
        match self {
            Self::PlayStatus => 0x01,
            Self::Track => 0x02,
            Self::Position => 0x05,
            Self::Volume => 0x0D,
        }
    }

    /// Parses an AVRCP event id.
    #[must_use]
    pub const fn from_event_id(event_id: u8) -> Option<Self> {
        match event_id {
            0x01 => Some(Self::PlayStatus),
            0x02 => Some(Self::Track),
            0x05 => Some(Self::Position),
            0x0D => Some(Self::Volume),
            _ => None,
        }
    }

    /// Transaction label used for this registration.
    pub(crate) const fn label(self) -> u8 {
        match self {
            Self::Track => 2,
            Self::PlayStatus => 3,
            Self::Volume => 4,
            Self::Position => 6,
        }
    }

    /// Notification interval requested from the peer, in seconds.
    pub(crate) const fn interval_secs(self) -> u32 {
        match self {
            Self::Position => POSITION_INTERVAL_SECS,
            Self::Track | Self::PlayStatus | Self::Volume => 0,
        }
    }
}

/// Set of notifications a peer supports, as an AVRCP event-id bitmask.
///
/// ```
/// use knob_link::{NotificationCapabilities, NotificationKind};
///
/// let caps = NotificationCapabilities::empty()
///     .with(NotificationKind::Track)
///     .with(NotificationKind::Volume);
/// assert_eq!(0x2004, caps.bits());
/// assert!(caps.contains(NotificationKind::Track));
/// assert!(!caps.contains(NotificationKind::Position));
/// ```
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct NotificationCapabilities(u16);

impl NotificationCapabilities {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn with(self, kind: NotificationKind) -> Self {
        Self(self.0 | (1 << kind.event_id()))
    }

    #[must_use]
    pub const fn contains(self, kind: NotificationKind) -> bool {
        self.0 & (1 << kind.event_id()) != 0
    }

    /// Supported kinds, in registration order.
    pub fn iter(self) -> impl Iterator<Item = NotificationKind> {
        NotificationKind::iter().filter(move |kind| self.contains(*kind))
    }
}

/// AVRCP media attribute ids used by this device.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MediaAttribute {
    Title,
    Artist,
    Album,
    PlayingTime,
}

impl MediaAttribute {
    #[must_use]
    pub const fn attribute_id(self) -> u8 {
        match self {
            Self::Title => 0x01,
            Self::Artist => 0x02,
            Self::Album => 0x04,
            Self::PlayingTime => 0x40,
        }
    }

    #[must_use]
    pub const fn from_attribute_id(attribute_id: u8) -> Option<Self> {
        match attribute_id {
            0x01 => Some(Self::Title),
            0x02 => Some(Self::Artist),
            0x04 => Some(Self::Album),
            0x40 => Some(Self::PlayingTime),
            _ => None,
        }
    }

    const fn meta_kind(self) -> MetaKind {
        match self {
            Self::Title => MetaKind::Title,
            Self::Artist => MetaKind::Artist,
            Self::Album => MetaKind::Album,
            Self::PlayingTime => MetaKind::Duration,
        }
    }
}

/// Bitmask of attributes requested in one metadata request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct MediaAttributeMask(u8);

impl MediaAttributeMask {
    /// Title, artist, album and playing time.
    pub const CORE: Self = Self(0x01 | 0x02 | 0x04 | 0x40);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, attribute: MediaAttribute) -> bool {
        self.0 & attribute.attribute_id() != 0
    }
}

/// AVRCP pass-through operation ids.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PassthroughKey {
    VolumeUp,
    VolumeDown,
    Play,
    Stop,
    Pause,
    Forward,
    Backward,
}

impl PassthroughKey {
    #[must_use]
    pub const fn operation_id(self) -> u8 {
        match self {
            Self::VolumeUp => 0x41,
            Self::VolumeDown => 0x42,
            Self::Play => 0x44,
            Self::Stop => 0x45,
            Self::Pause => 0x46,
            Self::Forward => 0x4B,
            Self::Backward => 0x4C,
        }
    }
}

/// Maps a raw AVRCP playback status to the link's play state.
#[must_use]
pub fn play_state_from_avrcp(status: u8) -> PlayState {
    match status {
        0 => PlayState::Stopped,
        1 => PlayState::Playing,
        2 => PlayState::Paused,
        _ => PlayState::Unknown,
    }
}

/// Maps a metadata response to the link's metadata kind and text.
///
/// Playing time is cut at the first non-digit; some stacks leave trailing
/// bytes after the number.
#[must_use]
pub fn metadata_from_avrcp(attribute_id: u8, text: &str) -> Option<(MetaKind, String)> {
    let attribute = MediaAttribute::from_attribute_id(attribute_id)?;
    let text = match attribute {
        MediaAttribute::PlayingTime => {
            let digits = text
                .find(|character: char| !character.is_ascii_digit())
                .unwrap_or(text.len());
            text[..digits].to_string()
        }
        MediaAttribute::Title | MediaAttribute::Artist | MediaAttribute::Album => text.to_string(),
    };
    Some((attribute.meta_kind(), text))
}

/// What a peer notification changed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum NotificationUpdate {
    TrackChanged,
    PlayState(PlayState),
    Volume(u8),
    Position(u32),
}

/// Classic side of the device: AVRCP controller and target roles plus the
/// audio-sink record.
pub(crate) struct ClassicSurface {
    radio: Box<dyn ClassicRadio>,
    visibility: ClassicVisibility,
    peer: Option<BdAddr>,
    capabilities: NotificationCapabilities,
    passthrough_label: u8,
}

impl ClassicSurface {
    /// Initialises the AVRCP roles and the audio sink, leaving the radio hidden.
    ///
    /// With `suppress_audio_sink` the sink's service record is withdrawn right
    /// after initialisation.
    #[instrument(skip(radio, audio_sink), level = "debug")]
    pub(crate) fn start(
        mut radio: Box<dyn ClassicRadio>,
        mut audio_sink: Box<dyn AudioSinkAdvertising>,
        device_name: &str,
        suppress_audio_sink: bool,
    ) -> Result<Self, ProfileError> {
        radio.start(device_name)?;
        if suppress_audio_sink {
            audio_sink.suppress_after_init()?;
            debug!("audio sink record withdrawn");
        }
        radio.set_visibility(ClassicVisibility::Hidden)?;
        Ok(Self {
            radio,
            visibility: ClassicVisibility::Hidden,
            peer: None,
            capabilities: NotificationCapabilities::empty(),
            passthrough_label: 0,
        })
    }

    pub(crate) fn local_address(&self) -> BdAddr {
        self.radio.local_address()
    }

    pub(crate) fn visibility(&self) -> ClassicVisibility {
        self.visibility
    }

    pub(crate) fn set_visibility(
        &mut self,
        visibility: ClassicVisibility,
    ) -> Result<(), ProfileError> {
        self.radio.set_visibility(visibility)?;
        self.visibility = visibility;
        Ok(())
    }

    pub(crate) fn peer(&self) -> Option<BdAddr> {
        self.peer
    }

    pub(crate) fn capabilities(&self) -> NotificationCapabilities {
        self.capabilities
    }

    pub(crate) fn connect(&mut self, peer: BdAddr) -> Result<(), ProfileError> {
        self.radio.connect(peer)
    }

    pub(crate) fn disconnect(&mut self) -> Result<(), ProfileError> {
        self.radio.disconnect()
    }

    /// Records the peer and asks for its notification capabilities.
    pub(crate) fn on_avrcp_connected(&mut self, peer: BdAddr) -> Result<(), ProfileError> {
        self.peer = Some(peer);
        self.radio.request_capabilities(LABEL_CAPABILITIES)
    }

    /// Clears per-connection state.
    pub(crate) fn on_avrcp_disconnected(&mut self) {
        self.peer = None;
        self.capabilities = NotificationCapabilities::empty();
    }

    /// Stores the capabilities, requests metadata and registers every supported
    /// notification.
    #[instrument(skip(self), level = "debug", fields(bits = format_args!("{:#06x}", capabilities.bits())))]
    pub(crate) fn on_capabilities(
        &mut self,
        capabilities: NotificationCapabilities,
    ) -> Result<(), ProfileError> {
        self.capabilities = capabilities;
        self.request_metadata()?;
        for kind in capabilities.iter() {
            info!(%kind, "registering for notification");
            self.register(kind)?;
        }
        Ok(())
    }

    /// Re-registers the notification that fired and reports what changed.
    pub(crate) fn on_notification(
        &mut self,
        notification: PeerNotification,
    ) -> Result<NotificationUpdate, ProfileError> {
        let (kind, update) = match notification {
            PeerNotification::TrackChanged => {
                self.request_metadata()?;
                (NotificationKind::Track, NotificationUpdate::TrackChanged)
            }
            PeerNotification::PlayStatusChanged(status) => (
                NotificationKind::PlayStatus,
                NotificationUpdate::PlayState(play_state_from_avrcp(status)),
            ),
            PeerNotification::VolumeChanged(volume) => {
                (NotificationKind::Volume, NotificationUpdate::Volume(volume))
            }
            PeerNotification::PlayPositionChanged(position_ms) => (
                NotificationKind::Position,
                NotificationUpdate::Position(position_ms),
            ),
        };
        self.register(kind)?;
        Ok(update)
    }

    pub(crate) fn request_metadata(&mut self) -> Result<(), ProfileError> {
        self.radio
            .request_metadata(LABEL_METADATA, MediaAttributeMask::CORE)
    }

    pub(crate) fn set_absolute_volume(&mut self, volume: u8) -> Result<(), ProfileError> {
        self.radio.set_absolute_volume(LABEL_SET_VOLUME, volume)
    }

    pub(crate) fn respond_volume_interim(&mut self, volume: u8) -> Result<(), ProfileError> {
        self.radio.respond_volume_interim(volume)
    }

    /// Sends a pass-through press and returns the label to release it with.
    pub(crate) fn press(&mut self, key: PassthroughKey) -> Result<u8, ProfileError> {
        let label = self.passthrough_label;
        self.passthrough_label = (self.passthrough_label + 1) % LABEL_MODULUS;
        self.radio.send_passthrough(label, key, true)?;
        Ok(label)
    }

    pub(crate) fn release(&mut self, label: u8, key: PassthroughKey) -> Result<(), ProfileError> {
        self.radio.send_passthrough(label, key, false)
    }

    pub(crate) fn shutdown(mut self) {
        if let Err(error) = self.radio.set_visibility(ClassicVisibility::Hidden) {
            warn!(%error, "failed to hide Classic radio during shutdown");
        }
        self.radio.stop();
    }

    fn register(&mut self, kind: NotificationKind) -> Result<(), ProfileError> {
        self.radio
            .register_notification(kind.label(), kind, kind.interval_secs())
    }
}
