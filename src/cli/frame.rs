use std::io;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::error::CliConfigError;
use crate::link::{FrameCodec, FrameDecoder, MAX_PAYLOAD_LEN};
use crate::terminal::TerminalClient;
use crate::utils::{format_hex, parse_hex};

use super::ui::{DecodedFrame, FrameListView, Painter};

/// Arguments for the `frame` command.
#[derive(Debug, Args)]
pub struct FrameArgs {
    #[command(subcommand)]
    action: FrameAction,
}

#[derive(Debug, Subcommand)]
pub enum FrameAction {
    /// Encode one frame and print its wire bytes.
    Encode {
        /// Frame type, decimal or `0x` hexadecimal.
        #[arg(value_parser = parse_opcode)]
        opcode: u8,
        /// Payload as hexadecimal bytes.
        payload: Option<String>,
    },
    /// Decode every frame found in a hexadecimal byte stream.
    Decode {
        /// Wire bytes as hexadecimal, delimiters included.
        bytes: String,
    },
}

#[derive(Debug, Serialize)]
struct EncodedFrame {
    opcode: u8,
    wire: String,
}

#[derive(Debug, Serialize)]
struct DecodedStream<'a> {
    frames: &'a [DecodedFrame],
    discarded: u64,
}

/// Executes the `frame` command.
#[instrument(skip(args, out, terminal_client), level = "debug", fields(?output_format))]
pub(crate) fn run<W>(
    args: &FrameArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    match &args.action {
        FrameAction::Encode { opcode, payload } => {
            let payload = payload.as_deref().map(parse_hex).transpose()?.unwrap_or_default();
            if payload.len() > MAX_PAYLOAD_LEN {
                return Err(CliConfigError::PayloadTooLarge { len: payload.len() }.into());
            }
            let wire = FrameCodec::encode(*opcode, &payload)?;
            match output_format {
                OutputFormat::Pretty => writeln!(out, "{}", format_hex(&wire))?,
                OutputFormat::Json => write_json_line(
                    out,
                    &EncodedFrame {
                        opcode: *opcode,
                        wire: format_hex(&wire),
                    },
                )?,
            }
        }
        FrameAction::Decode { bytes } => {
            let bytes = parse_hex(bytes)?;
            let mut decoder = FrameDecoder::new();
            let frames = decoder
                .feed_slice(&bytes)
                .iter()
                .map(DecodedFrame::new)
                .collect::<Vec<_>>();
            let stats = decoder.stats();
            match output_format {
                OutputFormat::Pretty => {
                    let painter = Painter::new(terminal_client.stdout_is_terminal());
                    writeln!(out, "{}", FrameListView::new(&frames, stats, &painter))?;
                }
                OutputFormat::Json => write_json_line(
                    out,
                    &DecodedStream {
                        frames: &frames,
                        discarded: stats.discarded(),
                    },
                )?,
            }
        }
    }
    Ok(())
}

pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn parse_opcode(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|error| error.to_string())
}
