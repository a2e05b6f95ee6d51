use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bon::Builder;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::bonds::BondStore;
use crate::bt::StackBackend;
use crate::cli::{Command, LogLevel, OutputFormat};
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::error::{LinkError, ProtocolError};
use crate::link::{Dispatcher, EventSink, ReceiveOutcome, run_receiver, run_writer};
use crate::power::{
    DEFAULT_SUSPEND_SETTLE, DEFAULT_WAKE_EDGE_THRESHOLD, PowerControl, WakeReason,
};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Radio-controller settings.
#[derive(Debug, Clone, Builder)]
pub struct ServeConfig {
    #[builder(default)]
    coordinator: CoordinatorConfig,
    /// Pause between flushing the deactivation acknowledgement and sleeping.
    #[builder(default = DEFAULT_SUSPEND_SETTLE)]
    suspend_settle: Duration,
    #[builder(default = DEFAULT_WAKE_EDGE_THRESHOLD)]
    wake_edge_threshold: u32,
    #[builder(default = DEFAULT_EVENT_QUEUE_CAPACITY)]
    event_queue_capacity: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// How a radio-controller run ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct ServeSummary {
    sessions: u32,
    suspends: u32,
}

impl ServeSummary {
    /// Number of times the stack and dispatcher were built.
    #[must_use]
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    #[must_use]
    pub fn suspends(&self) -> u32 {
        self.suspends
    }
}

/// Shared collaborators for a radio-controller run.
pub struct ServeContext<'a> {
    pub backend: Arc<dyn StackBackend>,
    pub bonds: BondStore,
    pub power: &'a dyn PowerControl,
    pub cancel: CancellationToken,
}

/// Runs the radio controller on a link until it closes or `cancel` fires.
///
/// Each session builds a fresh coordinator, dispatcher and writer. A
/// deactivation suspends until link activity, then starts a new session
/// that keeps the selected mode.
///
/// # Errors
///
/// Returns an error if the Bluetooth stack cannot be brought up or the link fails.
#[instrument(skip_all, level = "info")]
pub async fn serve<R, W>(
    mut reader: R,
    writer: W,
    config: ServeConfig,
    context: ServeContext<'_>,
) -> Result<ServeSummary, ProtocolError>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let ServeContext {
        backend,
        bonds,
        power,
        cancel,
    } = context;
    let mut summary = ServeSummary {
        sessions: 0,
        suspends: 0,
    };
    let mut mode = config.coordinator.mode();
    let mut writer = writer;

    loop {
        summary.sessions += 1;
        info!(session = summary.sessions, %mode, "starting session");
        let (events, receiver) = EventSink::channel(config.event_queue_capacity);
        let writer_task = tokio::spawn(run_writer(receiver, writer));
        let (coordinator, coordinator_task) = match Coordinator::spawn(
            config.coordinator.clone().with_mode(mode),
            Arc::clone(&backend),
            events.clone(),
            bonds.clone(),
        ) {
            Ok(spawned) => spawned,
            Err(error) => {
                drop(events);
                let _ = writer_task.await;
                return Err(error.into());
            }
        };
        let dispatcher = Dispatcher::new(coordinator.clone(), events);

        let outcome = run_receiver(&mut reader, &dispatcher, &cancel).await;

        if let Ok(status) = coordinator.status().await {
            mode = status.mode();
        }
        if let Err(error) = coordinator.shutdown().await {
            debug!(%error, "coordinator already stopped");
        }
        drop(dispatcher);
        drop(coordinator);
        coordinator_task
            .await
            .map_err(|_join_error| LinkError::CoordinatorClosed)?;
        writer = writer_task
            .await
            .map_err(|_join_error| LinkError::WriterClosed)??;

        match outcome? {
            ReceiveOutcome::Closed | ReceiveOutcome::Cancelled => {
                info!(?summary, "radio controller stopped");
                return Ok(summary);
            }
            ReceiveOutcome::Suspend => {
                summary.suspends += 1;
                sleep(config.suspend_settle).await;
                power.arm_wake(config.wake_edge_threshold).await?;
                let woken = tokio::select! {
                    () = cancel.cancelled() => None,
                    woken = power.suspend(&mut reader) => Some(woken?),
                };
                match woken {
                    Some(WakeReason::LinkActivity) => info!("woken, rebuilding from a clean state"),
                    Some(WakeReason::LinkClosed) | None => {
                        warn!("link closed while suspended");
                        return Ok(summary);
                    }
                }
            }
        }
    }
}

/// Runs the CLI command with default telemetry settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = knob_link::Args::try_parse_from(["knob-link", "frame", "encode", "0x01"])?;
/// let mut out = Vec::new();
/// knob_link::run(args.into_command(), &mut out).await?;
/// assert_eq!(b"02 01 01 02 6B 00\n".to_vec(), out);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the link fails, or
/// output writing fails.
pub async fn run<W>(command: Command, out: &mut W) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, None, OutputFormat::Pretty).await
}

/// Runs the CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the link fails, or
/// output writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        log_level,
        output_format,
    )
    .await
}

/// Runs the CLI command with an injected terminal client and explicit telemetry settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl knob_link::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = knob_link::Args::try_parse_from([
///     "knob-link",
///     "--log-level",
///     "trace",
///     "frame",
///     "decode",
///     "02 01 01 02 6B 00",
/// ])?;
/// let log_level = args.log_level();
/// let mut out = Vec::new();
/// knob_link::run_with_clients_and_log_level(
///     args.into_command(),
///     &mut out,
///     &FakeTerminal,
///     log_level,
///     knob_link::OutputFormat::Json,
/// ).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the link fails, or
/// output writing fails.
#[instrument(
    skip(out, terminal_client),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub async fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "knob-link",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Serve(args) => {
            crate::cli::serve::run(&args, out, terminal_client, output_format).await
        }
        Command::Probe(args) => {
            crate::cli::probe::run(&args, out, terminal_client, output_format).await
        }
        Command::Frame(args) => crate::cli::frame::run(&args, out, terminal_client, output_format),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Serve(_args) => "serve",
        Command::Probe(_args) => "probe",
        Command::Frame(_args) => "frame",
    }
}
