use serde_with::SerializeDisplay;
use strum_macros::{Display, EnumIter};
use tracing::{debug, instrument};

use super::address::BdAddr;
use super::stack::{BleHidRadio, BleIdentity, ProfileError};

/// Consumer-control usages sent in HID reports.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum ConsumerUsage {
    VolumeUp,
    VolumeDown,
    Play,
    Pause,
    PlayPause,
    NextTrack,
    PrevTrack,
}

impl ConsumerUsage {
    /// Returns the HID usage id from the consumer page.
    #[must_use]
    pub const fn usage_id(self) -> u16 {
        match self {
            Self::VolumeUp => 0xE9,
            Self::VolumeDown => 0xEA,
            Self::Play => 0xB0,
            Self::Pause => 0xB1,
            Self::PlayPause => 0xCD,
            Self::NextTrack => 0xB5,
            Self::PrevTrack => 0xB6,
        }
    }
}

/// LE HID side of the device: advertising, the connected peer, and key reports.
///
/// Visibility of the Classic radio is not touched here.
pub(crate) struct BleHidSurface {
    radio: Box<dyn BleHidRadio>,
    peer: Option<BdAddr>,
    connected_once: bool,
}

impl BleHidSurface {
    /// Starts the HID service and begins advertising with `identity`.
    #[instrument(skip(radio), level = "debug", fields(name = identity.name(), address = %identity.address()))]
    pub(crate) fn start(
        mut radio: Box<dyn BleHidRadio>,
        identity: &BleIdentity,
    ) -> Result<Self, ProfileError> {
        radio.start(identity)?;
        Ok(Self {
            radio,
            peer: None,
            connected_once: false,
        })
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    /// Whether a HID peer has connected since this surface started.
    pub(crate) fn has_connected_once(&self) -> bool {
        self.connected_once
    }

    pub(crate) fn peer(&self) -> Option<BdAddr> {
        self.peer
    }

    /// Records a new peer. Returns `true` on the first connect of the session.
    pub(crate) fn on_connected(&mut self, peer: BdAddr) -> bool {
        let first = !self.connected_once;
        self.peer = Some(peer);
        self.connected_once = true;
        first
    }

    /// Forgets the peer and resumes advertising.
    pub(crate) fn on_disconnected(&mut self) -> Result<(), ProfileError> {
        self.peer = None;
        self.radio.start_advertising(None)
    }

    /// Advertises towards a peer that just connected over Classic.
    ///
    /// Best effort: does nothing when a HID peer is already connected.
    pub(crate) fn advertise_towards(&mut self, peer: BdAddr) -> Result<(), ProfileError> {
        if self.is_connected() {
            debug!(%peer, "HID peer already connected, not advertising");
            return Ok(());
        }
        self.radio.start_advertising(Some(peer))
    }

    pub(crate) fn restart_advertising(&mut self) -> Result<(), ProfileError> {
        self.radio.start_advertising(None)
    }

    pub(crate) fn press(&mut self, usage: ConsumerUsage) -> Result<(), ProfileError> {
        self.radio.send_consumer_key(usage, true)
    }

    pub(crate) fn release(&mut self, usage: ConsumerUsage) -> Result<(), ProfileError> {
        self.radio.send_consumer_key(usage, false)
    }

    pub(crate) fn shutdown(mut self) {
        self.radio.stop();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ConsumerUsage::VolumeUp, 0xE9)]
    #[case(ConsumerUsage::VolumeDown, 0xEA)]
    #[case(ConsumerUsage::Play, 0xB0)]
    #[case(ConsumerUsage::Pause, 0xB1)]
    #[case(ConsumerUsage::PlayPause, 0xCD)]
    #[case(ConsumerUsage::NextTrack, 0xB5)]
    #[case(ConsumerUsage::PrevTrack, 0xB6)]
    fn usage_ids_follow_the_consumer_page(#[case] usage: ConsumerUsage, #[case] expected: u16) {
        assert_eq!(expected, usage.usage_id());
    }
}
