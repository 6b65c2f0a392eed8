use std::io;
use std::time::Duration;

use anyhow::Result;
use blecentral_macros::progress;
use clap::Args;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, instrument};

use crate::cli::OutputFormat;
use crate::cli::command::parse_duration;
use crate::error::InteractionError;
use crate::gatt::{BleEvent, PeripheralRecord, ScanFilters};
use crate::hw::TransportProvider;
use crate::service::BleService;
use crate::terminal::TerminalClient;

use super::ui::{Painter, ScanResultsView};

/// Arguments for the `scan` command.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Only report peripherals advertising exactly this name.
    #[arg(long)]
    name: Option<String>,
    /// Only report the peripheral with this address.
    #[arg(long)]
    address: Option<String>,
    /// Only report peripherals advertising this service UUID.
    #[arg(long)]
    service: Option<String>,
    /// How long to scan for (e.g. `5s`).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    duration: Duration,
}

impl ScanArgs {
    /// Creates scan arguments without filters.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            name: None,
            address: None,
            service: None,
            duration,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn filters(&self) -> ScanFilters {
        ScanFilters::builder()
            .maybe_name(self.name.clone())
            .maybe_address(self.address.clone())
            .maybe_service_uuid(self.service.clone())
            .build()
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    devices: Vec<PeripheralRecord>,
}

/// Executes the `scan` command.
#[instrument(skip(provider, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    provider: Box<dyn TransportProvider>,
    args: &ScanArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut service = BleService::start(provider).await?;
    let scanned = scan(&mut service, args).await;
    service.shutdown().await?;
    let report = ScanReport { devices: scanned? };

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", ScanResultsView::new(&report.devices, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

#[progress(message = "Scanning for peripherals")]
#[instrument(skip(service), level = "info")]
async fn scan(
    service: &mut BleService,
    args: &ScanArgs,
) -> Result<Vec<PeripheralRecord>, InteractionError> {
    let client = service.client();
    client.start_scan(args.filters()).await?;

    let deadline = sleep(args.duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = service.next_event() => match event {
                Some(BleEvent::DeviceFound { name, device }) => {
                    debug!(device = %device, name, "peripheral found");
                }
                Some(BleEvent::ScanFailed { message }) => {
                    return Err(InteractionError::Reported { message });
                }
                Some(_other) => {}
                None => return Err(InteractionError::EventStreamClosed),
            },
        }
    }

    client.stop_scan().await?;
    Ok(client.scan_results().await?)
}
