use std::time::Duration;

use anyhow::Result;
use blecentral_macros::progress;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{info, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::command::parse_duration;
use crate::error::InteractionError;
use crate::gatt::{BleEvent, DeviceId, ScanFilters};
use crate::service::BleService;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Selects the peripheral a command talks to.
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Peripheral address (or platform identifier) to connect to.
    #[arg(long, required_unless_present = "name", conflicts_with = "name")]
    address: Option<String>,
    /// Advertised name to scan for before connecting.
    #[arg(long)]
    name: Option<String>,
    /// How long to wait for the scan and the connection (e.g. `5s`).
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    timeout: Duration,
}

impl DeviceArgs {
    /// Targets a peripheral by address.
    #[must_use]
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            name: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Targets the first peripheral advertising `name`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            address: None,
            name: Some(name.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A peripheral that finished service discovery.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ConnectedDevice {
    pub(crate) device: DeviceId,
    pub(crate) name: Option<String>,
}

/// Resolves the target, connects, and waits for service discovery.
#[progress(
    message = "Connecting to peripheral",
    finished = format!("{} Connected", "✓".green()),
)]
#[instrument(skip(service), level = "info")]
pub(crate) async fn connect_ready(
    service: &mut BleService,
    target: &DeviceArgs,
) -> Result<ConnectedDevice> {
    match connect(service, target).await {
        Ok(connected) => Ok(connected),
        Err(error) => {
            let finish_message = format!("{} Connection failed", "✗".red());
            tracing::Span::current().pb_set_finish_message(&finish_message);
            Err(error.into())
        }
    }
}

async fn connect(
    service: &mut BleService,
    target: &DeviceArgs,
) -> Result<ConnectedDevice, InteractionError> {
    let client = service.client();
    let device = match (&target.address, &target.name) {
        (Some(address), _) => DeviceId::from(address.as_str()),
        (None, Some(name)) => {
            let filters = ScanFilters::builder().name(name.as_str()).build();
            client.start_scan(filters).await?;
            service
                .wait_for(target.timeout, "device scan", |event| match event {
                    BleEvent::DeviceFound { .. } => Some(Ok(())),
                    _ => None,
                })
                .await?;
            client.stop_scan().await?;
            client.connect_by_name(name.clone()).await?
        }
        (None, None) => {
            return Err(InteractionError::Reported {
                message: "either an address or a name is required".to_string(),
            });
        }
    };

    client.connect(device.clone()).await?;
    let mut name = None;
    service
        .wait_for(target.timeout, "service discovery", |event| {
            if event.device() != Some(&device) {
                return None;
            }
            match event {
                BleEvent::DeviceConnected {
                    name: advertised, ..
                } => {
                    name.clone_from(advertised);
                    None
                }
                BleEvent::ServiceDiscoverySuccess { .. } => Some(Ok(())),
                BleEvent::ConnectionError { message, .. }
                | BleEvent::ServiceDiscoveryFailed { message, .. } => {
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

    info!(device = %device, ?name, "peripheral ready");
    Ok(ConnectedDevice { device, name })
}
