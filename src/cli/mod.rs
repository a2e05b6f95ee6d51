pub(crate) mod command;
pub(crate) mod frame;
pub(crate) mod probe;
pub(crate) mod serve;
pub(crate) mod ui;

pub use self::command::{Args, Command, LinkTarget, LogLevel, OutputFormat};
pub use self::frame::{FrameAction, FrameArgs};
pub use self::probe::ProbeArgs;
pub use self::serve::ServeArgs;
