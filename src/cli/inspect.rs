use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::device::{ConnectedDevice, DeviceArgs, connect_ready};
use crate::gatt::ServiceInfo;
use crate::hw::TransportProvider;
use crate::service::BleService;
use crate::terminal::TerminalClient;

use super::ui::{DeviceView, Painter, ServiceTreeView};

/// Arguments for the `inspect` command.
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    device: DeviceArgs,
}

impl InspectArgs {
    #[must_use]
    pub fn new(device: DeviceArgs) -> Self {
        Self { device }
    }
}

#[derive(Debug, Serialize)]
struct InspectReport {
    device: ConnectedDevice,
    services: Vec<ServiceInfo>,
}

/// Executes the `inspect` command.
#[instrument(skip(provider, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    provider: Box<dyn TransportProvider>,
    args: &InspectArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut service = BleService::start(provider).await?;
    let inspected = inspect(&mut service, args).await;
    service.shutdown().await?;
    let report = inspected?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", painter.heading("Connected device:"))?;
            writeln!(out, "{}", DeviceView::new(&report.device, &painter))?;
            writeln!(out)?;
            writeln!(out, "{}", painter.heading("GATT services:"))?;
            writeln!(out, "{}", ServiceTreeView::new(&report.services, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

async fn inspect(service: &mut BleService, args: &InspectArgs) -> Result<InspectReport> {
    let device = connect_ready(service, &args.device).await?;
    let services = service.client().services(device.device.clone()).await?;
    Ok(InspectReport { device, services })
}
