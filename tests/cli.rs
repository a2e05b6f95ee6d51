use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use clap::error::ErrorKind;
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl knob_link::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_argv<const N: usize>(
    argv: [&str; N],
    output_format: knob_link::OutputFormat,
) -> anyhow::Result<String> {
    let args = knob_link::Args::try_parse_from(argv)?;
    let mut output = Vec::new();
    knob_link::run_with_clients_and_log_level(
        args.into_command(),
        &mut output,
        &FakeTerminalClient,
        None,
        output_format,
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

fn unique_temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("knob-link-{name}-{}-{nanos}", std::process::id()))
}

#[tokio::test]
async fn frame_encode_prints_wire_bytes() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["knob-link", "frame", "encode", "0x01"],
        knob_link::OutputFormat::Pretty,
    )
    .await?;

    assert_eq!("02 01 01 02 6B 00\n", stdout);
    Ok(())
}

#[tokio::test]
async fn frame_encode_json_reports_opcode_and_wire() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["knob-link", "frame", "encode", "0xF1"],
        knob_link::OutputFormat::Json,
    )
    .await?;

    let json: serde_json::Value = serde_json::from_str(stdout.trim())?;
    assert_eq!(serde_json::json!({ "opcode": 0xF1, "wire": "02 F1 01 02 07 00" }), json);
    Ok(())
}

#[tokio::test]
async fn frame_decode_lists_frames_and_discarded_bytes() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "knob-link",
            "frame",
            "decode",
            "13 37 00 02 01 01 02 6B 00 02 F1 01 02 07 00",
        ],
        knob_link::OutputFormat::Pretty,
    )
    .await?;

    assert!(stdout.starts_with("Frames:"), "unexpected output: {stdout}");
    assert!(stdout.contains("command play"), "unexpected output: {stdout}");
    assert!(stdout.contains("event pong"), "unexpected output: {stdout}");
    assert!(stdout.trim_end().ends_with("discarded 1"), "unexpected output: {stdout}");
    Ok(())
}

#[tokio::test]
async fn frame_decode_rejects_invalid_hex() {
    let result = run_with_argv(
        ["knob-link", "frame", "decode", "zz"],
        knob_link::OutputFormat::Pretty,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn serve_answers_a_ping_from_a_link_file() -> anyhow::Result<()> {
    let link = unique_temp_path("serve");
    std::fs::write(&link, knob_link::Command::Ping.encode()?)?;
    let link_arg = link.to_string_lossy().into_owned();

    let result = run_with_argv(
        [
            "knob-link",
            "serve",
            "--link",
            &link_arg,
            "--ephemeral-bonds",
        ],
        knob_link::OutputFormat::Json,
    )
    .await;
    let written = std::fs::read(&link);
    std::fs::remove_file(&link)?;

    let json: serde_json::Value = serde_json::from_str(result?.trim())?;
    assert_eq!(serde_json::json!({ "sessions": 1, "suspends": 0 }), json);
    assert_eq!(knob_link::Event::Pong.encode()?, written?);
    Ok(())
}

#[tokio::test]
async fn serve_reports_missing_link_path() {
    let link = unique_temp_path("missing").join("link");
    let link_arg = link.to_string_lossy().into_owned();

    let result = run_with_argv(
        ["knob-link", "serve", "--link", &link_arg, "--ephemeral-bonds"],
        knob_link::OutputFormat::Json,
    )
    .await;

    let error = result.expect_err("missing link should fail");
    assert!(
        error.downcast_ref::<knob_link::LinkError>().is_some(),
        "unexpected error: {error:#}"
    );
}

#[test]
fn probe_requires_a_link() {
    let error = knob_link::Args::try_parse_from(["knob-link", "probe", "--send", "play"])
        .expect_err("probe without a link should fail");

    assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
}
