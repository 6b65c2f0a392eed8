use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, instrument, trace};

use crate::error::{InteractionError, OperationError};
use crate::gatt::{
    BleEvent, CharacteristicProperties, CharacteristicValue, ConnectionManager, ConnectionState,
    DeviceId, OperationOutcome, PeripheralRecord, ScanFilters, ServiceInfo, TransportEvent,
};
use crate::hw::TransportProvider;

const REQUEST_CAPACITY: usize = 32;

type Request = Box<dyn FnOnce(&mut ConnectionManager) + Send>;

/// Runs a [`ConnectionManager`] on its own task.
///
/// Requests are serialised with transport callbacks, so the manager is only
/// ever touched from one place. Events are read back with
/// [`BleService::next_event`] or [`BleService::wait_for`].
#[derive(Debug)]
pub struct BleService {
    client: BleClient,
    events: mpsc::UnboundedReceiver<BleEvent>,
    task: JoinHandle<()>,
    shutdown: CancellationToken,
    _guard: DropGuard,
}

impl BleService {
    /// Opens the transport and starts the manager task.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened.
    #[instrument(skip(provider), level = "debug")]
    pub async fn start(provider: Box<dyn TransportProvider>) -> Result<Self, InteractionError> {
        let (transport_sender, transport_events) = mpsc::unbounded_channel();
        let transport = provider.open(transport_sender).await?;

        let (event_sender, events) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(transport, Box::new(event_sender));
        let (requests_sender, requests) = mpsc::channel(REQUEST_CAPACITY);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_manager(
            manager,
            requests,
            transport_events,
            shutdown.clone(),
        ));

        Ok(Self {
            client: BleClient {
                requests: requests_sender,
            },
            events,
            task,
            _guard: shutdown.clone().drop_guard(),
            shutdown,
        })
    }

    /// A handle for issuing requests; clones share the same manager.
    #[must_use]
    pub fn client(&self) -> BleClient {
        self.client.clone()
    }

    /// Waits for the next event, or `None` once the manager task is gone.
    pub async fn next_event(&mut self) -> Option<BleEvent> {
        self.events.recv().await
    }

    /// Waits until `matcher` resolves an event, dropping events it passes on.
    ///
    /// # Errors
    ///
    /// Returns the matcher's error, [`InteractionError::Timeout`] when nothing
    /// matches within `within`, or [`InteractionError::EventStreamClosed`].
    pub async fn wait_for<T, F>(
        &mut self,
        within: Duration,
        what: &'static str,
        mut matcher: F,
    ) -> Result<T, InteractionError>
    where
        F: FnMut(&BleEvent) -> Option<Result<T, InteractionError>>,
    {
        let waiting = async {
            while let Some(event) = self.events.recv().await {
                match matcher(&event) {
                    Some(resolved) => return resolved,
                    None => trace!(event = event.name(), "skipping event"),
                }
            }
            Err(InteractionError::EventStreamClosed)
        };

        timeout(within, waiting)
            .await
            .map_err(|_elapsed| InteractionError::Timeout {
                what,
                waited: within,
            })?
    }

    /// Disconnects everything and waits for the manager task to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager task panicked.
    pub async fn shutdown(self) -> Result<(), InteractionError> {
        let Self { task, shutdown, .. } = self;
        shutdown.cancel();
        task.await.map_err(|_join| OperationError::ServiceStopped)?;
        Ok(())
    }
}

async fn run_manager(
    mut manager: ConnectionManager,
    mut requests: mpsc::Receiver<Request>,
    mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request(&mut manager),
                None => break,
            },
            Some(event) = transport_events.recv() => manager.handle_transport_event(event),
        }
    }

    debug!("shutting down connection manager");
    manager.shutdown();
}

/// Cloneable request handle for a running [`BleService`].
///
/// Every method mirrors the [`ConnectionManager`] operation of the same name
/// and fails with [`OperationError::ServiceStopped`] once the service is gone.
#[derive(Debug, Clone)]
pub struct BleClient {
    requests: mpsc::Sender<Request>,
}

impl BleClient {
    async fn call<T, F>(&self, operation: F) -> Result<T, OperationError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ConnectionManager) -> T + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let request: Request = Box::new(move |manager| {
            // The caller may have given up waiting.
            let _ = reply.send(operation(manager));
        });
        self.requests
            .send(request)
            .await
            .map_err(|_closed| OperationError::ServiceStopped)?;
        response.await.map_err(|_dropped| OperationError::ServiceStopped)
    }

    pub async fn start_scan(&self, filters: ScanFilters) -> Result<(), OperationError> {
        self.call(move |manager| manager.start_scan(filters)).await?
    }

    pub async fn stop_scan(&self) -> Result<(), OperationError> {
        self.call(ConnectionManager::stop_scan).await
    }

    pub async fn is_scanning(&self) -> Result<bool, OperationError> {
        self.call(|manager| manager.is_scanning()).await
    }

    pub async fn scan_results(&self) -> Result<Vec<PeripheralRecord>, OperationError> {
        self.call(|manager| manager.scan_results().to_vec()).await
    }

    pub async fn connect(&self, device: DeviceId) -> Result<ConnectionState, OperationError> {
        self.call(move |manager| manager.connect(&device)).await?
    }

    pub async fn connect_by_name(&self, name: String) -> Result<DeviceId, OperationError> {
        self.call(move |manager| manager.connect_by_name(&name))
            .await?
    }

    pub async fn disconnect(&self, device: DeviceId) -> Result<bool, OperationError> {
        self.call(move |manager| manager.disconnect(&device)).await
    }

    pub async fn connection_state(
        &self,
        device: DeviceId,
    ) -> Result<ConnectionState, OperationError> {
        self.call(move |manager| manager.connection_state(&device))
            .await
    }

    pub async fn is_connected(&self, device: DeviceId) -> Result<bool, OperationError> {
        self.call(move |manager| manager.is_connected(&device)).await
    }

    pub async fn has_service(&self, device: DeviceId, uuid: String) -> Result<bool, OperationError> {
        self.call(move |manager| manager.has_service(&device, &uuid))
            .await
    }

    pub async fn has_characteristic(
        &self,
        device: DeviceId,
        uuid: String,
    ) -> Result<bool, OperationError> {
        self.call(move |manager| manager.has_characteristic(&device, &uuid))
            .await
    }

    pub async fn services(&self, device: DeviceId) -> Result<Vec<ServiceInfo>, OperationError> {
        self.call(move |manager| manager.services(&device)).await
    }

    pub async fn properties(
        &self,
        device: DeviceId,
        uuid: String,
    ) -> Result<Option<CharacteristicProperties>, OperationError> {
        self.call(move |manager| manager.properties(&device, &uuid))
            .await
    }

    pub async fn cached_value(
        &self,
        device: DeviceId,
        uuid: String,
    ) -> Result<Option<Vec<u8>>, OperationError> {
        self.call(move |manager| manager.cached_value(&device, &uuid).map(<[u8]>::to_vec))
            .await
    }

    pub async fn mtu(&self, device: DeviceId) -> Result<Option<u16>, OperationError> {
        self.call(move |manager| manager.mtu(&device)).await
    }

    pub async fn read_characteristic(
        &self,
        device: DeviceId,
        uuid: String,
    ) -> Result<OperationOutcome, OperationError> {
        self.call(move |manager| manager.read_characteristic(&device, &uuid))
            .await?
    }

    pub async fn write_characteristic(
        &self,
        device: DeviceId,
        uuid: String,
        value: CharacteristicValue,
    ) -> Result<OperationOutcome, OperationError> {
        self.call(move |manager| manager.write_characteristic(&device, &uuid, &value))
            .await?
    }

    pub async fn write_bytes(
        &self,
        device: DeviceId,
        uuid: String,
        payload: Vec<u8>,
    ) -> Result<OperationOutcome, OperationError> {
        self.call(move |manager| manager.write_bytes(&device, &uuid, payload))
            .await?
    }

    pub async fn set_notifications(
        &self,
        device: DeviceId,
        uuid: String,
        enable: bool,
    ) -> Result<OperationOutcome, OperationError> {
        self.call(move |manager| manager.set_notifications(&device, &uuid, enable))
            .await?
    }

    pub async fn request_mtu(&self, device: DeviceId, mtu: u16) -> Result<(), OperationError> {
        self.call(move |manager| manager.request_mtu(&device, mtu))
            .await?
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hw::{
        BODY_SENSOR_LOCATION, CUSTOM_DATA, FakeBackendConfig, HEART_RATE_MEASUREMENT,
        HardwareBackend, transport_provider_from_backend,
    };

    const WAIT: Duration = Duration::from_secs(5);

    async fn fake_service() -> BleService {
        let config = FakeBackendConfig::builder()
            .scan_fixture("AA:BB|Sensor;CC:DD|-".parse().expect("fixture should parse"))
            .build();
        BleService::start(transport_provider_from_backend(HardwareBackend::Fake(
            config,
        )))
        .await
        .expect("fake service should start")
    }

    async fn ready(service: &mut BleService, device: &str) -> DeviceId {
        let device = DeviceId::from(device);
        service
            .client()
            .connect(device.clone())
            .await
            .expect("connect accepted");
        service
            .wait_for(WAIT, "service discovery", |event| match event {
                BleEvent::ServiceDiscoverySuccess { .. } => Some(Ok(())),
                _ => None,
            })
            .await
            .expect("device should become ready");
        device
    }

    #[tokio::test]
    async fn scan_reports_each_named_fixture() {
        let mut service = fake_service().await;
        let client = service.client();

        client
            .start_scan(ScanFilters::default())
            .await
            .expect("scan accepted");
        let found = service
            .wait_for(WAIT, "device found", |event| match event {
                BleEvent::DeviceFound { name, .. } => Some(Ok(name.clone())),
                _ => None,
            })
            .await
            .expect("named device should be found");

        assert_eq!("Sensor", found);
        assert_eq!(2, client.scan_results().await.expect("results").len());
        service.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn connect_reaches_ready_and_reads_default_payload() {
        let mut service = fake_service().await;
        let device = ready(&mut service, "AA:BB").await;
        let client = service.client();

        assert_eq!(
            ConnectionState::Ready,
            client.connection_state(device.clone()).await.expect("state")
        );
        client
            .read_characteristic(device.clone(), BODY_SENSOR_LOCATION.to_string())
            .await
            .expect("read accepted");
        let value = service
            .wait_for(WAIT, "read", |event| match event {
                BleEvent::CharacteristicRead { value, .. } => Some(Ok(value.clone())),
                _ => None,
            })
            .await
            .expect("read should complete");

        assert_eq!(vec![0x2A, 0x00, 0x00, 0x00], value);
        service.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn write_then_read_round_trips_through_fake_peripheral() {
        let mut service = fake_service().await;
        let device = ready(&mut service, "AA:BB").await;
        let client = service.client();

        client
            .write_characteristic(
                device.clone(),
                CUSTOM_DATA.to_string(),
                CharacteristicValue::Utf8("hi".to_string()),
            )
            .await
            .expect("write accepted");
        client
            .read_characteristic(device.clone(), CUSTOM_DATA.to_string())
            .await
            .expect("read accepted");
        let value = service
            .wait_for(WAIT, "read", |event| match event {
                BleEvent::CharacteristicRead { value, .. } => Some(Ok(value.clone())),
                _ => None,
            })
            .await
            .expect("read should complete");

        assert_eq!(b"hi".to_vec(), value);
        service.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn enabling_notifications_delivers_fixture_payloads() {
        let mut service = fake_service().await;
        let device = ready(&mut service, "AA:BB").await;

        service
            .client()
            .set_notifications(device, HEART_RATE_MEASUREMENT.to_string(), true)
            .await
            .expect("notifications accepted");

        let mut changed = 0;
        while changed < 3 {
            service
                .wait_for(WAIT, "notification", |event| match event {
                    BleEvent::CharacteristicChanged { .. } => Some(Ok(())),
                    _ => None,
                })
                .await
                .expect("notification should arrive");
            changed += 1;
        }
        service.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn unknown_device_reports_connection_error() {
        let mut service = fake_service().await;

        service
            .client()
            .connect(DeviceId::from("FF:FF"))
            .await
            .expect("connect accepted");
        let message = service
            .wait_for(WAIT, "connection error", |event| match event {
                BleEvent::ConnectionError { message, .. } => Some(Ok(message.clone())),
                _ => None,
            })
            .await
            .expect("connection error should be reported");

        assert_eq!("Connection Error 133 encountered for FF:FF! Disconnecting...", message);
        service.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_times_out_when_nothing_matches() {
        let mut service = fake_service().await;

        let result = service
            .wait_for(Duration::from_millis(50), "nothing", |_event| None::<Result<(), _>>)
            .await;

        assert_matches!(result, Err(InteractionError::Timeout { what: "nothing", .. }));
    }

    #[tokio::test]
    async fn client_fails_once_service_stops() {
        let service = fake_service().await;
        let client = service.client();

        service.shutdown().await.expect("clean shutdown");

        assert_matches!(
            client.is_scanning().await,
            Err(OperationError::ServiceStopped)
        );
    }
}
