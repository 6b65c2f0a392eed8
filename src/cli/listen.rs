use std::io;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::OutputFormat;
use crate::cli::device::{ConnectedDevice, DeviceArgs, connect_ready};
use crate::error::InteractionError;
use crate::gatt::BleEvent;
use crate::hw::TransportProvider;
use crate::service::BleService;
use crate::terminal::TerminalClient;
use crate::utils::serialize_hex;

use super::same_uuid;
use super::ui::{ListenReadyView, ListenSummaryView, NotificationView, Painter};

/// Arguments for the `listen` command.
#[derive(Debug, Clone, Args)]
pub struct ListenArgs {
    #[command(flatten)]
    device: DeviceArgs,
    /// Characteristic UUID to enable notifications (or indications) on.
    #[arg(long)]
    uuid: String,
    /// Stop after this many notifications. If omitted, listen until Ctrl+C.
    #[arg(long)]
    max_notifications: Option<usize>,
}

impl ListenArgs {
    /// Creates listen arguments with an optional notification limit.
    #[must_use]
    pub fn new(device: DeviceArgs, uuid: impl Into<String>, max_notifications: Option<usize>) -> Self {
        Self {
            device,
            uuid: uuid.into(),
            max_notifications,
        }
    }
}

/// Why a listen session ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ListenStopReason {
    ReachedLimit,
    Interrupted,
    Disconnected,
}

/// One received notification.
#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub(crate) index: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub(crate) value: Vec<u8>,
}

/// Totals reported once listening stops.
#[derive(Debug, Serialize)]
pub(crate) struct ListenSummary {
    pub(crate) device: ConnectedDevice,
    pub(crate) uuid: String,
    pub(crate) received: usize,
    pub(crate) stop_reason: ListenStopReason,
}

/// Executes the `listen` command.
#[instrument(skip(provider, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    provider: Box<dyn TransportProvider>,
    args: &ListenArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let painter = Painter::new(terminal_client.stdout_is_terminal());
    let mut service = BleService::start(provider).await?;
    let listened = listen(&mut service, args, |output| match (output, output_format) {
        (ListenOutput::Ready(device), OutputFormat::Pretty) => {
            writeln!(out, "{}", ListenReadyView::new(device, &args.uuid, &painter))
        }
        (ListenOutput::Notification(notification), OutputFormat::Pretty) => {
            writeln!(out, "{}", NotificationView::new(notification, &painter))
        }
        (ListenOutput::Notification(notification), OutputFormat::Json) => {
            serde_json::to_writer(&mut *out, notification)?;
            writeln!(out)
        }
        (ListenOutput::Ready(_device), OutputFormat::Json) => Ok(()),
    })
    .await;
    service.shutdown().await?;
    let summary = listened?;

    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ListenSummaryView::new(&summary, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &summary)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

enum ListenOutput<'a> {
    Ready(&'a ConnectedDevice),
    Notification(&'a Notification),
}

async fn listen<F>(service: &mut BleService, args: &ListenArgs, mut emit: F) -> Result<ListenSummary>
where
    F: FnMut(ListenOutput<'_>) -> io::Result<()>,
{
    let device = connect_ready(service, &args.device).await?;
    let client = service.client();
    client
        .set_notifications(device.device.clone(), args.uuid.clone(), true)
        .await?;
    service
        .wait_for(args.device.timeout(), "notification subscription", |event| {
            match event {
                BleEvent::NotificationsUpdated { uuid, .. } if same_uuid(uuid, &args.uuid) => {
                    Some(Ok(()))
                }
                BleEvent::NotificationError { uuid, message, .. } if same_uuid(uuid, &args.uuid) => {
                    Some(Err(InteractionError::Reported {
                        message: message.clone(),
                    }))
                }
                _ => None,
            }
        })
        .await?;
    emit(ListenOutput::Ready(&device))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut received = 0;
    let stop_reason = loop {
        if args.max_notifications.is_some_and(|limit| received >= limit) {
            break ListenStopReason::ReachedLimit;
        }
        let event = tokio::select! {
            interrupted = &mut ctrl_c => {
                interrupted.map_err(|source| InteractionError::CtrlC { source })?;
                break ListenStopReason::Interrupted;
            }
            event = service.next_event() => event.ok_or(InteractionError::EventStreamClosed)?,
        };
        match event {
            BleEvent::CharacteristicChanged { uuid, value, .. } if same_uuid(&uuid, &args.uuid) => {
                received += 1;
                emit(ListenOutput::Notification(&Notification {
                    index: received,
                    value,
                }))?;
            }
            BleEvent::DeviceDisconnected { .. } => break ListenStopReason::Disconnected,
            other => debug!(event = other.name(), "ignoring event while listening"),
        }
    };

    if stop_reason != ListenStopReason::Disconnected
        && let Err(error) = client
            .set_notifications(device.device.clone(), args.uuid.clone(), false)
            .await
    {
        debug!(%error, "failed to disable notifications cleanly");
    }

    Ok(ListenSummary {
        device,
        uuid: args.uuid.clone(),
        received,
        stop_reason,
    })
}
