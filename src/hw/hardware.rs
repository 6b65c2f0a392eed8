use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use super::btleplug_backend::BtleplugTransport;
use super::fake_backend::{FakeBackendConfig, FakeTransport};
use crate::error::InteractionError;
use crate::gatt::{Transport, TransportEvent};

/// Runtime BLE backend selection.
#[derive(Debug)]
pub(crate) enum HardwareBackend {
    Real,
    Fake(FakeBackendConfig),
}

/// Builds an injected transport provider for the selected runtime backend.
pub(crate) fn transport_provider_from_backend(
    backend: HardwareBackend,
) -> Box<dyn TransportProvider> {
    match backend {
        HardwareBackend::Real => Box::new(RealTransportProvider),
        HardwareBackend::Fake(config) => Box::new(FakeTransportProvider { config }),
    }
}

/// Opens the transport a [`crate::BleService`] drives.
#[async_trait]
pub trait TransportProvider: Send {
    /// Opens the transport, delivering its callbacks on `events`.
    async fn open(
        self: Box<Self>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, InteractionError>;
}

#[derive(Debug)]
struct RealTransportProvider;

#[async_trait]
impl TransportProvider for RealTransportProvider {
    async fn open(
        self: Box<Self>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, InteractionError> {
        Ok(Box::new(BtleplugTransport::open(events).await?))
    }
}

#[derive(Debug)]
struct FakeTransportProvider {
    config: FakeBackendConfig,
}

#[async_trait]
impl TransportProvider for FakeTransportProvider {
    async fn open(
        self: Box<Self>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Box<dyn Transport>, InteractionError> {
        info!("using fake BLE backend");
        let Self { config } = *self;
        Ok(Box::new(FakeTransport::new(config, events)))
    }
}
