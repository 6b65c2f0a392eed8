use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::OutputFormat;
use crate::cli::device::{ConnectedDevice, DeviceArgs, connect_ready};
use crate::error::InteractionError;
use crate::gatt::{BleEvent, CharacteristicValue, ValueEncoding};
use crate::hw::TransportProvider;
use crate::service::BleService;
use crate::terminal::TerminalClient;
use crate::utils::serialize_hex;

use super::same_uuid;
use super::ui::{Painter, ReadResultView};

/// Arguments for the `read` command.
#[derive(Debug, Clone, Args)]
pub struct ReadArgs {
    #[command(flatten)]
    device: DeviceArgs,
    /// Characteristic UUID to read.
    #[arg(long)]
    uuid: String,
    /// Also decode the value with this encoding (`int32`, `uint8`, `utf8`, `float32`).
    #[arg(long)]
    encoding: Option<ValueEncoding>,
}

impl ReadArgs {
    #[must_use]
    pub fn new(device: DeviceArgs, uuid: impl Into<String>) -> Self {
        Self {
            device,
            uuid: uuid.into(),
            encoding: None,
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }
}

/// Outcome of one characteristic read.
#[derive(Debug, Serialize)]
pub(crate) struct ReadReport {
    pub(crate) device: ConnectedDevice,
    pub(crate) uuid: String,
    #[serde(serialize_with = "serialize_hex")]
    pub(crate) value: Vec<u8>,
    pub(crate) decoded: Option<String>,
}

/// Executes the `read` command.
#[instrument(skip(provider, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    provider: Box<dyn TransportProvider>,
    args: &ReadArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut service = BleService::start(provider).await?;
    let read = read(&mut service, args).await;
    service.shutdown().await?;
    let report = read?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", ReadResultView::new(&report, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

async fn read(service: &mut BleService, args: &ReadArgs) -> Result<ReadReport> {
    let device = connect_ready(service, &args.device).await?;
    let outcome = service
        .client()
        .read_characteristic(device.device.clone(), args.uuid.clone())
        .await?;
    debug!(?outcome, "read submitted");

    let value = service
        .wait_for(args.device.timeout(), "characteristic read", |event| {
            match event {
                BleEvent::CharacteristicRead { uuid, value, .. } if same_uuid(uuid, &args.uuid) => {
                    Some(Ok(value.clone()))
                }
                BleEvent::CharacteristicReadError { uuid, message, .. }
                    if same_uuid(uuid, &args.uuid) =>
                {
                    Some(Err(InteractionError::Reported {
                        message: message.clone(),
                    }))
                }
                BleEvent::DeviceDisconnected { device } => {
                    Some(Err(InteractionError::Disconnected {
                        device: device.clone(),
                    }))
                }
                _ => None,
            }
        })
        .await?;

    let decoded = args.encoding.map(|encoding| {
        CharacteristicValue::decode(encoding, &value)
            .map_or_else(|| format!("<not {encoding}>"), |decoded| decoded.to_string())
    });
    Ok(ReadReport {
        device,
        uuid: args.uuid.clone(),
        value,
        decoded,
    })
}
