use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, warn};

use crate::cli::OutputFormat;
use crate::cli::command::{LinkTarget, parse_duration};
use crate::cli::frame::write_json_line;
use crate::error::LinkError;
use crate::health::HealthStatus;
use crate::link::{ClientConfig, Command, Event, LinkClient};
use crate::protocol::CommandType;
use crate::terminal::TerminalClient;

use super::ui::{EventView, HealthView, Painter};

/// Arguments for the `probe` command.
#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Link device or pipe path, or `-` for stdin/stdout.
    #[arg(long)]
    link: LinkTarget,
    /// Command to send, e.g. `play`, `set_volume:70`, `bt_set_mode:controller`. Repeatable.
    #[arg(long = "send")]
    commands: Vec<Command>,
    /// How long to print events after the last command (e.g. `2s`).
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    listen: Duration,
    /// Heartbeat ping period (e.g. `3s`).
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    heartbeat: Duration,
    /// Send commands without waiting for the handshake.
    #[arg(long)]
    skip_handshake: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProbeRecord<'a> {
    Handshake { ok: bool, error: Option<String> },
    Sent { command: CommandType },
    Event { event: &'a Event },
    Health { status: HealthStatus },
}

struct ProbeOutput<'a, W> {
    out: &'a mut W,
    painter: Painter,
    output_format: OutputFormat,
}

impl<W: io::Write> ProbeOutput<'_, W> {
    fn write(&mut self, record: &ProbeRecord<'_>) -> Result<()> {
        if self.output_format == OutputFormat::Json {
            return write_json_line(self.out, record);
        }
        let painter = &self.painter;
        match record {
            ProbeRecord::Handshake { ok: true, .. } => {
                writeln!(self.out, "{}", painter.success("handshake complete"))?;
            }
            ProbeRecord::Handshake { error, .. } => writeln!(
                self.out,
                "{} {}",
                painter.failure("handshake failed"),
                painter.muted(error.as_deref().unwrap_or_default())
            )?,
            ProbeRecord::Sent { command } => writeln!(
                self.out,
                "{} {}",
                painter.muted("sent"),
                painter.value(command.to_string())
            )?,
            ProbeRecord::Event { event } => writeln!(self.out, "{}", EventView::new(event, painter))?,
            ProbeRecord::Health { status } => {
                writeln!(self.out, "{}", HealthView::new(*status, painter))?;
            }
        }
        Ok(())
    }
}

/// Executes the `probe` command.
#[instrument(skip(args, out, terminal_client), level = "info", fields(link = %args.link, ?output_format))]
pub(crate) async fn run<W>(
    args: &ProbeArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let (reader, writer) = args.link.open().await?;
    let config = ClientConfig::builder()
        .heartbeat_interval(args.heartbeat)
        .build();
    let mut client = LinkClient::spawn(reader, writer, config);
    let mut output = ProbeOutput {
        out,
        painter: Painter::new(terminal_client.stdout_is_terminal()),
        output_format,
    };

    let result = probe_with_client(&mut client, args, &mut output).await;
    let close_result = client.close().await;
    if let Err(error) = close_result {
        if result.is_ok() {
            return Err(error.into());
        }
        debug!(%error, "failed to close link client cleanly");
    }
    result
}

async fn probe_with_client<W: io::Write>(
    client: &mut LinkClient,
    args: &ProbeArgs,
    output: &mut ProbeOutput<'_, W>,
) -> Result<()> {
    if !args.skip_handshake {
        let handshake = client.handshake().await;
        output.write(&ProbeRecord::Handshake {
            ok: handshake.is_ok(),
            error: handshake.as_ref().err().map(ToString::to_string),
        })?;
        handshake?;
    }

    for command in &args.commands {
        client.send(*command).await?;
        output.write(&ProbeRecord::Sent {
            command: command.command_type(),
        })?;
    }

    let mut health = client.health();
    health.mark_unchanged();
    let deadline = Instant::now() + args.listen;
    loop {
        tokio::select! {
            () = sleep_until(deadline) => break,
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|source| LinkError::CtrlC { source })?;
                break;
            }
            event = client.next_event() => {
                let Some(event) = event else {
                    warn!("link closed while listening");
                    break;
                };
                output.write(&ProbeRecord::Event { event: &event })?;
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *health.borrow_and_update();
                output.write(&ProbeRecord::Health { status })?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cli::Args;

    #[test]
    fn parses_repeated_commands() {
        let args = Args::try_parse_from([
            "knob-link",
            "probe",
            "--link",
            "/tmp/knob",
            "--send",
            "play",
            "--send",
            "set_volume:70",
        ])
        .expect("probe arguments should parse");

        let crate::cli::Command::Probe(probe) = args.into_command() else {
            panic!("expected probe");
        };
        assert_eq!(vec![Command::Play, Command::SetVolume(70)], probe.commands);
        assert_eq!(Duration::from_secs(2), probe.listen);
    }

    #[test]
    fn rejects_unknown_commands() {
        let result = Args::try_parse_from(["knob-link", "probe", "--link", "-", "--send", "dance"]);

        assert!(result.is_err());
    }

    #[test]
    fn records_serialise_with_kind_tag() {
        let json = serde_json::to_value(ProbeRecord::Sent {
            command: CommandType::Play,
        })
        .expect("record should serialise");

        assert_eq!(serde_json::json!({ "kind": "sent", "command": "play" }), json);
    }
}
