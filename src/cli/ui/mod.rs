mod event_view;
mod frame_view;
mod painter;
mod table;

pub(crate) use self::event_view::{EventView, HealthView, ServeSummaryView};
pub(crate) use self::frame_view::{DecodedFrame, FrameListView};
pub(crate) use self::painter::Painter;
