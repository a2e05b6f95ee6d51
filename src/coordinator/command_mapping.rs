use std::collections::HashMap;
use std::sync::LazyLock;

use strum_macros::Display;

use crate::bt::{ConsumerUsage, PassthroughKey};
use crate::link::{Mode, PlayState};

/// Playback and volume keys the link can ask for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKey {
    Play,
    Pause,
    PlayPause,
    Next,
    Prev,
    VolumeUp,
    VolumeDown,
}

impl MediaKey {
    /// AVRCP pass-through used when no HID peer is connected.
    ///
    /// Pass-through has no toggle, so the toggle follows the last known play state.
    #[must_use]
    pub fn passthrough_key(self, play_state: PlayState) -> PassthroughKey {
        match self {
            Self::Play => PassthroughKey::Play,
            Self::Pause => PassthroughKey::Pause,
            Self::PlayPause if play_state == PlayState::Playing => PassthroughKey::Pause,
            Self::PlayPause => PassthroughKey::Play,
            Self::Next => PassthroughKey::Forward,
            Self::Prev => PassthroughKey::Backward,
            Self::VolumeUp => PassthroughKey::VolumeUp,
            Self::VolumeDown => PassthroughKey::VolumeDown,
        }
    }
}

/// HID usages for the play controls of one peer class.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandMapping {
    play: ConsumerUsage,
    pause: ConsumerUsage,
    play_pause: ConsumerUsage,
}

impl CommandMapping {
    /// Separate play and pause usages.
    pub const DISCRETE: Self = Self {
        play: ConsumerUsage::Play,
        pause: ConsumerUsage::Pause,
        play_pause: ConsumerUsage::PlayPause,
    };

    /// Every play control becomes the toggle usage.
    pub const TOGGLE_ONLY: Self = Self {
        play: ConsumerUsage::PlayPause,
        pause: ConsumerUsage::PlayPause,
        play_pause: ConsumerUsage::PlayPause,
    };

    #[must_use]
    pub const fn usage_for(self, key: MediaKey) -> ConsumerUsage {
        match key {
            MediaKey::Play => self.play,
            MediaKey::Pause => self.pause,
            MediaKey::PlayPause => self.play_pause,
            MediaKey::Next => ConsumerUsage::NextTrack,
            MediaKey::Prev => ConsumerUsage::PrevTrack,
            MediaKey::VolumeUp => ConsumerUsage::VolumeUp,
            MediaKey::VolumeDown => ConsumerUsage::VolumeDown,
        }
    }
}

/// Per-mode peer handling, resolved once per connection.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PeerProfile {
    pub mapping: CommandMapping,
    /// Withdraw the audio-sink record after bring-up.
    pub suppress_audio_sink: bool,
}

static PEER_PROFILES: LazyLock<HashMap<Mode, PeerProfile>> = LazyLock::new(|| {
    HashMap::from([
        (
            Mode::Phone,
            PeerProfile {
                mapping: CommandMapping::DISCRETE,
                suppress_audio_sink: true,
            },
        ),
        (
            Mode::Controller,
            PeerProfile {
                mapping: CommandMapping::TOGGLE_ONLY,
                suppress_audio_sink: true,
            },
        ),
        (
            Mode::ControllerNoHack,
            PeerProfile {
                mapping: CommandMapping::TOGGLE_ONLY,
                suppress_audio_sink: false,
            },
        ),
    ])
});

impl PeerProfile {
    #[must_use]
    pub fn for_mode(mode: Mode) -> Self {
        PEER_PROFILES.get(&mode).copied().unwrap_or(PeerProfile {
            mapping: CommandMapping::DISCRETE,
            suppress_audio_sink: true,
        })
    }
}
