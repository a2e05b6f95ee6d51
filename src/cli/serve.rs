use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::app::{ServeConfig, ServeContext, serve};
use crate::bonds::BondStore;
use crate::bt::{BdAddr, FakeStackBackend, FakeStackConfig, StackScript};
use crate::cli::OutputFormat;
use crate::cli::command::{LinkTarget, parse_duration};
use crate::cli::frame::write_json_line;
use crate::coordinator::{
    CoordinatorConfig, DEFAULT_BLE_NAME, DEFAULT_CLASSIC_NAME, DEFAULT_INITIAL_VOLUME,
};
use crate::link::Mode;
use crate::power::{DEFAULT_WAKE_EDGE_THRESHOLD, LinkActivityWake};
use crate::terminal::TerminalClient;

use super::ui::{Painter, ServeSummaryView};

/// Arguments for the `serve` command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Link device or pipe path, or `-` for stdin/stdout.
    #[arg(long, default_value = "-")]
    link: LinkTarget,
    /// Simulated stack callbacks in the form `delay|event|args;...`.
    #[arg(long, default_value = "")]
    stack_script: StackScript,
    /// Classic address reported by the simulated stack.
    #[arg(long)]
    local_address: Option<BdAddr>,
    /// Peer class used for the command mapping.
    #[arg(long, value_enum, default_value_t = Mode::Phone)]
    mode: Mode,
    #[arg(long, default_value = DEFAULT_CLASSIC_NAME)]
    classic_name: String,
    #[arg(long, default_value = DEFAULT_BLE_NAME)]
    ble_name: String,
    /// Metadata refresh period while connected (e.g. `5s`).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    metadata_poll: Duration,
    /// Delay between key press and release (e.g. `50ms`).
    #[arg(long, default_value = "50ms", value_parser = parse_duration)]
    key_settle: Duration,
    #[arg(long, default_value_t = DEFAULT_INITIAL_VOLUME)]
    initial_volume: u8,
    /// Link edges needed to wake from suspend.
    #[arg(long, default_value_t = DEFAULT_WAKE_EDGE_THRESHOLD)]
    wake_edges: u32,
    /// Bond store file; defaults to the platform data directory.
    #[arg(long, conflicts_with = "ephemeral_bonds")]
    bonds: Option<PathBuf>,
    /// Keep bonds in memory only.
    #[arg(long)]
    ephemeral_bonds: bool,
}

impl ServeArgs {
    fn serve_config(&self) -> ServeConfig {
        let coordinator = CoordinatorConfig::builder()
            .mode(self.mode)
            .classic_name(self.classic_name.clone())
            .ble_name(self.ble_name.clone())
            .metadata_poll_interval(self.metadata_poll)
            .key_settle(self.key_settle)
            .initial_volume(self.initial_volume)
            .build();
        ServeConfig::builder()
            .coordinator(coordinator)
            .wake_edge_threshold(self.wake_edges)
            .build()
    }

    fn backend(&self) -> FakeStackBackend {
        let config = FakeStackConfig::builder()
            .script(self.stack_script.clone())
            .maybe_local_address(self.local_address)
            .build();
        FakeStackBackend::new(config)
    }

    fn bond_store(&self) -> Result<BondStore> {
        if self.ephemeral_bonds {
            return Ok(BondStore::in_memory());
        }
        Ok(BondStore::load(self.bonds.as_deref())?)
    }
}

/// Executes the `serve` command.
#[instrument(skip(args, out, terminal_client), level = "info", fields(link = %args.link, mode = %args.mode))]
pub(crate) async fn run<W>(
    args: &ServeArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let (reader, writer) = args.link.open().await?;
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received, stopping");
            cancel.cancel();
        }
    });

    let power = LinkActivityWake;
    let context = ServeContext {
        backend: Arc::new(args.backend()),
        bonds: args.bond_store()?,
        power: &power,
        cancel,
    };
    let result = serve(reader, writer, args.serve_config(), context).await;
    ctrl_c.abort();
    let summary = result?;

    // stdout is the link itself in stdio mode.
    if args.link.is_stdio() {
        return Ok(());
    }
    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", ServeSummaryView::new(&summary, &painter))?;
        }
        OutputFormat::Json => write_json_line(out, &summary)?,
    }
    Ok(())
}
