use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::frame::FrameArgs;
use crate::cli::probe::ProbeArgs;
use crate::cli::serve::ServeArgs;
use crate::error::LinkError;

pub(crate) type LinkReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type LinkWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Command-line options for the knob link tools.
#[derive(Debug, Parser)]
#[command(
    name = "knob-link",
    about = "Radio controller and tooling for the media knob serial link."
)]
pub struct Args {
    /// Overrides `RUST_LOG` for this run.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long = "output", global = true, value_enum)]
    output_format: Option<OutputFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output_format: None,
            command,
        }
    }

    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicitly requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    #[must_use]
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the radio controller on a link against the simulated Bluetooth stack.
    Serve(ServeArgs),
    /// Act as the display controller: handshake, send commands and print events.
    Probe(ProbeArgs),
    /// Encode or decode link frames offline.
    Frame(FrameArgs),
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Where a link lives: a device or pipe path, or `-` for stdio.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LinkTarget {
    Stdio,
    Path(PathBuf),
}

impl FromStr for LinkTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Err("link path cannot be empty".to_string()),
            "-" => Ok(Self::Stdio),
            path => Ok(Self::Path(PathBuf::from(path))),
        }
    }
}

impl LinkTarget {
    /// Opens separate read and write handles so a blocked read never stalls writes.
    pub(crate) async fn open(&self) -> Result<(LinkReader, LinkWriter), LinkError> {
        match self {
            Self::Stdio => Ok((Box::new(tokio::io::stdin()), Box::new(tokio::io::stdout()))),
            Self::Path(path) => {
                let open_error = |source| LinkError::Open {
                    path: path.clone(),
                    source,
                };
                let reader = OpenOptions::new()
                    .read(true)
                    .open(path)
                    .await
                    .map_err(open_error)?;
                let writer = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .await
                    .map_err(open_error)?;
                Ok((Box::new(reader), Box::new(writer)))
            }
        }
    }

    #[must_use]
    pub(crate) fn is_stdio(&self) -> bool {
        matches!(self, Self::Stdio)
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub(crate) fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let args = Args::try_parse_from([
            "knob-link",
            "frame",
            "decode",
            "00",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("global flags should parse anywhere");

        assert_eq!(Some(LogLevel::Debug), args.log_level());
        assert_eq!(Some(OutputFormat::Json), args.output_format());
        assert_matches!(args.into_command(), Command::Frame(_));
    }

    #[test]
    fn a_subcommand_is_required() {
        let error = Args::try_parse_from(["knob-link"]).expect_err("missing command should fail");

        assert_matches!(
            error.kind(),
            ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[rstest]
    #[case("-", LinkTarget::Stdio)]
    #[case("/dev/ttyUSB0", LinkTarget::Path(PathBuf::from("/dev/ttyUSB0")))]
    fn parses_link_targets(#[case] raw: &str, #[case] expected: LinkTarget) {
        assert_eq!(expected, raw.parse::<LinkTarget>().expect("target should parse"));
    }

    #[test]
    fn rejects_empty_link_target() {
        assert_matches!("  ".parse::<LinkTarget>(), Err(_));
    }
}
