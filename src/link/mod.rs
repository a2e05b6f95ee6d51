//! Serial link between the display controller and the radio controller.

mod client;
mod dispatcher;
pub(crate) mod frame_codec;
mod message;
mod transport;

pub use client::{
    ClientConfig, DEFAULT_HANDSHAKE_ATTEMPTS, DEFAULT_HANDSHAKE_INTERVAL,
    DEFAULT_HEARTBEAT_INTERVAL, LinkClient,
};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use frame_codec::{
    DecoderStats, FRAME_DELIMITER, Frame, FrameCodec, FrameDecoder, FrameError, MAX_PAYLOAD_LEN,
};
pub use message::{
    BtState, Command, CommandError, ErrorCode, Event, EventDecodeError, MAX_VOLUME, MetaKind,
    Mode, PlayState,
};
pub use transport::{EventReceiver, EventSink, ReceiveOutcome, run_receiver, run_writer};
