mod address;
pub(crate) mod ble_hid;
pub(crate) mod classic;
mod fake_backend;
mod stack;

pub use address::{AddressParseError, BdAddr};
pub use ble_hid::ConsumerUsage;
pub use classic::{
    MediaAttribute, MediaAttributeMask, NotificationCapabilities, NotificationKind,
    PassthroughKey, metadata_from_avrcp, play_state_from_avrcp,
};
pub use fake_backend::{FakeStackBackend, FakeStackConfig, StackCall, StackCallLog, StackScript};
pub use stack::{
    AudioSinkAdvertising, AudioSinkState, BleHidRadio, BleIdentity, BluetoothStack, ClassicRadio,
    ClassicVisibility, PeerNotification, Profile, ProfileError, StackBackend, StackEvent,
    StackEventSender,
};
