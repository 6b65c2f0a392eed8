use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::device::{ConnectedDevice, DeviceArgs, connect_ready};
use crate::error::{CliConfigError, InteractionError};
use crate::gatt::{BleEvent, CharacteristicValue, OperationOutcome, ValueEncoding};
use crate::hw::TransportProvider;
use crate::service::BleService;
use crate::terminal::TerminalClient;
use crate::utils::serialize_hex;

use super::same_uuid;
use super::ui::{Painter, WriteResultView};

/// Arguments for the `write` command.
#[derive(Debug, Clone, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    device: DeviceArgs,
    /// Characteristic UUID to write.
    #[arg(long)]
    uuid: String,
    /// Encoding applied to VALUE (`int32`, `uint8`, `utf8`, `float32`).
    #[arg(long, default_value = "utf8")]
    encoding: ValueEncoding,
    /// Value to write.
    #[arg(allow_hyphen_values = true)]
    value: String,
}

impl WriteArgs {
    #[must_use]
    pub fn new(
        device: DeviceArgs,
        uuid: impl Into<String>,
        encoding: ValueEncoding,
        value: impl Into<String>,
    ) -> Self {
        Self {
            device,
            uuid: uuid.into(),
            encoding,
            value: value.into(),
        }
    }
}

/// Outcome of one characteristic write.
#[derive(Debug, Serialize)]
pub(crate) struct WriteReport {
    pub(crate) device: ConnectedDevice,
    pub(crate) uuid: String,
    pub(crate) value: String,
    #[serde(serialize_with = "serialize_hex")]
    pub(crate) payload: Vec<u8>,
    pub(crate) outcome: OperationOutcome,
}

/// Executes the `write` command.
#[instrument(skip(provider, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    provider: Box<dyn TransportProvider>,
    args: &WriteArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let value = parse_value(args.encoding, &args.value)?;
    let mut service = BleService::start(provider).await?;
    let written = write(&mut service, args, value).await;
    service.shutdown().await?;
    let report = written?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", WriteResultView::new(&report, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

async fn write(
    service: &mut BleService,
    args: &WriteArgs,
    value: CharacteristicValue,
) -> Result<WriteReport> {
    let device = connect_ready(service, &args.device).await?;
    let payload = value.encode();
    let outcome = service
        .client()
        .write_characteristic(device.device.clone(), args.uuid.clone(), value.clone())
        .await?;

    service
        .wait_for(args.device.timeout(), "characteristic write", |event| {
            match event {
                BleEvent::CharacteristicWritten { uuid, .. } if same_uuid(uuid, &args.uuid) => {
                    Some(Ok(()))
                }
                BleEvent::CharacteristicWriteError { uuid, message, .. }
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

    Ok(WriteReport {
        device,
        uuid: args.uuid.clone(),
        value: value.to_string(),
        payload,
        outcome,
    })
}

/// Parses VALUE with the selected encoding. `uint8` keeps the low byte of any integer.
fn parse_value(encoding: ValueEncoding, raw: &str) -> Result<CharacteristicValue, CliConfigError> {
    let invalid = || CliConfigError::InvalidWriteValue {
        value: raw.to_string(),
        encoding: encoding.into(),
    };
    match encoding {
        ValueEncoding::Int32 => raw
            .trim()
            .parse()
            .map(CharacteristicValue::Int32)
            .map_err(|_error| invalid()),
        ValueEncoding::Uint8 => raw
            .trim()
            .parse()
            .map(CharacteristicValue::uint8_from_low_byte)
            .map_err(|_error| invalid()),
        ValueEncoding::Utf8 => Ok(CharacteristicValue::Utf8(raw.to_string())),
        ValueEncoding::Float32 => raw
            .trim()
            .parse()
            .map(CharacteristicValue::Float32)
            .map_err(|_error| invalid()),
    }
}
