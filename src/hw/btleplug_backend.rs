use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::error::{InteractionError, OperationError, TransportError};
use crate::gatt::{
    CCCD_UUID, CharacteristicInfo, ConnectionHandle, DISABLE_NOTIFICATION_VALUE, DeviceId,
    GATT_ERROR, GattStatus, ScanFilters, ServiceInfo, Transport, TransportEvent, WriteMode,
    canonical_uuid,
};

/// Android's `SCAN_FAILED_INTERNAL_ERROR`, reused for adapter scan failures.
const SCAN_FAILED_INTERNAL_ERROR: u16 = 3;

type Events = mpsc::UnboundedSender<TransportEvent>;

#[derive(Debug, Default)]
struct Shared {
    scanning: AtomicBool,
    live: Mutex<HashMap<DeviceId, ConnectionHandle>>,
}

impl Shared {
    fn track(&self, handle: ConnectionHandle) {
        lock(&self.live).insert(handle.device().clone(), handle);
    }

    fn untrack(&self, device: &DeviceId) -> Option<ConnectionHandle> {
        lock(&self.live).remove(device)
    }
}

#[derive(Debug)]
struct Link {
    cancel: CancellationToken,
    delivering: Arc<Mutex<HashSet<String>>>,
}

/// Transport backed by the first `btleplug` adapter.
///
/// Every command spawns a task on the runtime that performs the async
/// `btleplug` call and reports its completion as a [`TransportEvent`].
#[derive(Debug)]
pub(crate) struct BtleplugTransport {
    _manager: Manager,
    adapter: Adapter,
    runtime: Handle,
    events: Events,
    shared: Arc<Shared>,
    links: HashMap<DeviceId, Link>,
    shutdown: CancellationToken,
}

impl BtleplugTransport {
    /// Opens the first adapter and starts forwarding its central events.
    #[instrument(skip(events), level = "debug")]
    pub(crate) async fn open(events: Events) -> Result<Self, InteractionError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(InteractionError::NoAdapters)?;
        let adapter_info = adapter.adapter_info().await?;
        info!(adapter = %adapter_info, "using BLE adapter");

        let transport = Self {
            _manager: manager,
            adapter,
            runtime: Handle::current(),
            events,
            shared: Arc::new(Shared::default()),
            links: HashMap::new(),
            shutdown: CancellationToken::new(),
        };
        transport.runtime.spawn(log_failure(
            "central event pump",
            pump_central_events(
                transport.adapter.clone(),
                Arc::clone(&transport.shared),
                transport.events.clone(),
                transport.shutdown.clone(),
            ),
        ));
        Ok(transport)
    }

    /// Runs `operation` in the background and delivers the event it resolves to.
    fn complete<F>(&self, operation: F)
    where
        F: Future<Output = TransportEvent> + Send + 'static,
    {
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let event = operation.await;
            if events.send(event).is_err() {
                trace!("transport event receiver dropped");
            }
        });
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Transport for BtleplugTransport {
    fn start_scan(&mut self, filters: &ScanFilters) -> Result<(), TransportError> {
        let adapter = self.adapter.clone();
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let filter = scan_filter(filters);
        shared.scanning.store(true, Ordering::Release);

        self.runtime.spawn(async move {
            if let Err(error) = adapter.start_scan(filter).await {
                warn!(%error, "adapter refused to scan");
                shared.scanning.store(false, Ordering::Release);
                let failed = TransportEvent::ScanFailed {
                    code: SCAN_FAILED_INTERNAL_ERROR,
                };
                if events.send(failed).is_err() {
                    trace!("transport event receiver dropped");
                }
            }
        });
        Ok(())
    }

    fn stop_scan(&mut self) {
        self.shared.scanning.store(false, Ordering::Release);
        let adapter = self.adapter.clone();
        self.runtime.spawn(async move {
            if let Err(error) = adapter.stop_scan().await {
                debug!(%error, "failed to stop adapter scan cleanly");
            }
        });
    }

    fn connect(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        let link = Link {
            cancel: self.shutdown.child_token(),
            delivering: Arc::default(),
        };
        let cancel = link.cancel.clone();
        let delivering = Arc::clone(&link.delivering);
        self.links.insert(handle.device().clone(), link);

        let adapter = self.adapter.clone();
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let runtime = self.runtime.clone();
        let handle = handle.clone();
        self.complete(async move {
            let peripheral = match connect_peripheral(&adapter, handle.device()).await {
                Ok(peripheral) => peripheral,
                Err(error) => {
                    warn!(device = %handle.device(), %error, "connection attempt failed");
                    return TransportEvent::ConnectionStateChanged {
                        handle,
                        status: failure(),
                        connected: false,
                    };
                }
            };

            let released = peripheral.clone();
            let kept = adopt_link(&cancel, handle.device(), || async move {
                released.disconnect().await
            })
            .await;
            if kept {
                shared.track(handle.clone());
                runtime.spawn(log_failure(
                    "notification pump",
                    pump_notifications(peripheral, handle.clone(), delivering, events, cancel),
                ));
            }
            TransportEvent::ConnectionStateChanged {
                handle,
                status: GattStatus::Success,
                connected: true,
            }
        });
        Ok(())
    }

    fn disconnect(&mut self, handle: &ConnectionHandle) {
        if let Some(link) = self.links.remove(handle.device()) {
            link.cancel.cancel();
        }
        self.shared.untrack(handle.device());

        let adapter = self.adapter.clone();
        let device = handle.device().clone();
        self.runtime.spawn(async move {
            let result = async {
                let peripheral = find_peripheral(&adapter, &device).await?;
                if peripheral.is_connected().await? {
                    peripheral.disconnect().await?;
                }
                Ok::<_, InteractionError>(())
            }
            .await;
            if let Err(error) = result {
                debug!(device = %device, %error, "failed to disconnect cleanly");
            }
        });
    }

    fn discover_services(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        let adapter = self.adapter.clone();
        let handle = handle.clone();
        self.complete(async move {
            match discover(&adapter, handle.device()).await {
                Ok(services) => TransportEvent::ServicesDiscovered {
                    handle,
                    status: GattStatus::Success,
                    services,
                },
                Err(error) => {
                    warn!(device = %handle.device(), %error, "service discovery failed");
                    TransportEvent::ServicesDiscovered {
                        handle,
                        status: failure(),
                        services: Vec::new(),
                    }
                }
            }
        });
        Ok(())
    }

    fn read_characteristic(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
    ) -> Result<(), TransportError> {
        let adapter = self.adapter.clone();
        let handle = handle.clone();
        let uuid = uuid.to_string();
        self.complete(async move {
            let result = async {
                let (peripheral, characteristic) =
                    resolve_characteristic(&adapter, handle.device(), &uuid).await?;
                Ok::<_, InteractionError>(peripheral.read(&characteristic).await?)
            }
            .await;
            let (status, value) = match result {
                Ok(value) => (GattStatus::Success, value),
                Err(error) => {
                    warn!(device = %handle.device(), uuid, %error, "read failed");
                    (failure(), Vec::new())
                }
            };
            TransportEvent::CharacteristicRead {
                handle,
                uuid,
                status,
                value,
            }
        });
        Ok(())
    }

    fn write_characteristic(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        let adapter = self.adapter.clone();
        let handle = handle.clone();
        let uuid = uuid.to_string();
        let payload = payload.to_vec();
        self.complete(async move {
            let result = async {
                let (peripheral, characteristic) =
                    resolve_characteristic(&adapter, handle.device(), &uuid).await?;
                peripheral
                    .write(&characteristic, &payload, write_type(mode))
                    .await?;
                Ok::<_, InteractionError>(())
            }
            .await;
            let status = match result {
                Ok(()) => GattStatus::Success,
                Err(error) => {
                    warn!(device = %handle.device(), uuid, %error, "write failed");
                    failure()
                }
            };
            TransportEvent::CharacteristicWritten {
                handle,
                uuid,
                status,
            }
        });
        Ok(())
    }

    fn set_notification_delivery(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
        enable: bool,
    ) -> Result<(), TransportError> {
        let link = self
            .links
            .get(handle.device())
            .ok_or_else(|| TransportError::Rejected(format!("no link to {}", handle.device())))?;
        let mut delivering = lock(&link.delivering);
        if enable {
            delivering.insert(canonical_uuid(uuid));
        } else {
            delivering.remove(&canonical_uuid(uuid));
        }
        Ok(())
    }

    fn write_descriptor(
        &mut self,
        handle: &ConnectionHandle,
        characteristic_uuid: &str,
        descriptor_uuid: &str,
        value: &[u8],
    ) -> Result<(), TransportError> {
        let adapter = self.adapter.clone();
        let handle = handle.clone();
        let characteristic_uuid = characteristic_uuid.to_string();
        let descriptor_uuid = descriptor_uuid.to_string();
        let value = value.to_vec();
        self.complete(async move {
            let result = write_descriptor(
                &adapter,
                handle.device(),
                &characteristic_uuid,
                &descriptor_uuid,
                &value,
            )
            .await;
            let status = match result {
                Ok(()) => GattStatus::Success,
                Err(error) => {
                    warn!(device = %handle.device(), characteristic_uuid, %error, "descriptor write failed");
                    failure()
                }
            };
            TransportEvent::DescriptorWritten {
                handle,
                characteristic_uuid,
                descriptor_uuid,
                status,
            }
        });
        Ok(())
    }

    fn request_mtu(&mut self, _handle: &ConnectionHandle, _mtu: u16) -> Result<(), TransportError> {
        Err(TransportError::Unsupported)
    }
}

async fn pump_central_events(
    adapter: Adapter,
    shared: Arc<Shared>,
    events: Events,
    shutdown: CancellationToken,
) -> Result<(), InteractionError> {
    let mut central_events = adapter.events().await?;
    loop {
        let event = tokio::select! {
            () = shutdown.cancelled() => break,
            event = central_events.next() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let forwarded = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if !shared.scanning.load(Ordering::Acquire) {
                    continue;
                }
                match scan_result(&adapter, &id).await {
                    Ok(event) => event,
                    Err(error) => {
                        debug!(%error, "failed to read advertisement properties");
                        None
                    }
                }
            }
            CentralEvent::DeviceDisconnected(id) => shared
                .untrack(&DeviceId::from(id.to_string()))
                .map(|handle| TransportEvent::ConnectionStateChanged {
                    handle,
                    status: GattStatus::Success,
                    connected: false,
                }),
            _ => None,
        };

        if let Some(event) = forwarded
            && events.send(event).is_err()
        {
            break;
        }
    }
    Ok(())
}

async fn pump_notifications(
    peripheral: Peripheral,
    handle: ConnectionHandle,
    delivering: Arc<Mutex<HashSet<String>>>,
    events: Events,
    cancel: CancellationToken,
) -> Result<(), InteractionError> {
    let mut notifications = peripheral.notifications().await?;
    loop {
        let notification = tokio::select! {
            () = cancel.cancelled() => break,
            notification = notifications.next() => match notification {
                Some(notification) => notification,
                None => break,
            },
        };

        let uuid = canonical_uuid(&notification.uuid.to_string());
        if !lock(&delivering).contains(&uuid) {
            trace!(uuid, "dropping notification with delivery disabled");
            continue;
        }
        let event = TransportEvent::CharacteristicChanged {
            handle: handle.clone(),
            uuid,
            value: notification.value,
        };
        if events.send(event).is_err() {
            break;
        }
    }
    Ok(())
}

async fn scan_result(
    adapter: &Adapter,
    id: &PeripheralId,
) -> Result<Option<TransportEvent>, InteractionError> {
    let peripheral = adapter.peripheral(id).await?;
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };
    Ok(Some(TransportEvent::ScanResult {
        device: DeviceId::from(id.to_string()),
        name: properties.local_name,
        services: properties
            .services
            .iter()
            .map(ToString::to_string)
            .collect(),
    }))
}

async fn find_peripheral(
    adapter: &Adapter,
    device: &DeviceId,
) -> Result<Peripheral, InteractionError> {
    adapter
        .peripherals()
        .await?
        .into_iter()
        .find(|peripheral| peripheral.id().to_string() == device.as_str())
        .ok_or_else(|| InteractionError::UnknownPeripheral {
            device: device.clone(),
        })
}

async fn connect_peripheral(
    adapter: &Adapter,
    device: &DeviceId,
) -> Result<Peripheral, InteractionError> {
    let peripheral = find_peripheral(adapter, device).await?;
    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }
    info!(device = %device, "connected to peripheral");
    Ok(peripheral)
}

async fn discover(adapter: &Adapter, device: &DeviceId) -> Result<Vec<ServiceInfo>, InteractionError> {
    let peripheral = find_peripheral(adapter, device).await?;
    peripheral.discover_services().await?;
    Ok(collect_services(&peripheral))
}

async fn resolve_characteristic(
    adapter: &Adapter,
    device: &DeviceId,
    uuid: &str,
) -> Result<(Peripheral, Characteristic), InteractionError> {
    let peripheral = find_peripheral(adapter, device).await?;
    let wanted = canonical_uuid(uuid);
    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|characteristic| characteristic.uuid.to_string() == wanted)
        .ok_or_else(|| OperationError::NotFound {
            device: device.clone(),
            uuid: uuid.to_string(),
        })?;
    Ok((peripheral, characteristic))
}

async fn write_descriptor(
    adapter: &Adapter,
    device: &DeviceId,
    characteristic_uuid: &str,
    descriptor_uuid: &str,
    value: &[u8],
) -> Result<(), InteractionError> {
    let (peripheral, characteristic) =
        resolve_characteristic(adapter, device, characteristic_uuid).await?;

    // btleplug owns the CCCD; subscribing writes it for us.
    if canonical_uuid(descriptor_uuid) == canonical_uuid(CCCD_UUID) {
        if value == DISABLE_NOTIFICATION_VALUE {
            peripheral.unsubscribe(&characteristic).await?;
        } else {
            peripheral.subscribe(&characteristic).await?;
        }
        return Ok(());
    }

    let wanted = canonical_uuid(descriptor_uuid);
    let descriptor = characteristic
        .descriptors
        .iter()
        .find(|descriptor| descriptor.uuid.to_string() == wanted)
        .cloned()
        .ok_or_else(|| OperationError::NotFound {
            device: device.clone(),
            uuid: descriptor_uuid.to_string(),
        })?;
    peripheral.write_descriptor(&descriptor, value).await?;
    Ok(())
}

fn collect_services(peripheral: &Peripheral) -> Vec<ServiceInfo> {
    let mut services: Vec<ServiceInfo> = peripheral
        .services()
        .into_iter()
        .map(|service| {
            let characteristics = service
                .characteristics
                .iter()
                .map(|characteristic| {
                    CharacteristicInfo::new(
                        characteristic.uuid.to_string(),
                        property_bits(characteristic.properties),
                        characteristic
                            .descriptors
                            .iter()
                            .map(|descriptor| descriptor.uuid.to_string())
                            .collect(),
                    )
                })
                .collect();
            ServiceInfo::new(service.uuid.to_string(), service.primary, characteristics)
        })
        .collect();
    services.sort_by(|left, right| left.uuid().cmp(right.uuid()));
    services
}

/// `btleplug` uses the GATT property bit layout, so the bits carry over as is.
fn property_bits(flags: CharPropFlags) -> u8 {
    flags.bits()
}

fn scan_filter(filters: &ScanFilters) -> ScanFilter {
    ScanFilter {
        services: filters
            .service_uuid()
            .and_then(|uuid| Uuid::parse_str(uuid).ok())
            .into_iter()
            .collect(),
    }
}

fn write_type(mode: WriteMode) -> WriteType {
    match mode {
        WriteMode::WithResponse => WriteType::WithResponse,
        WriteMode::WithoutResponse => WriteType::WithoutResponse,
    }
}

fn failure() -> GattStatus {
    GattStatus::from_code(GATT_ERROR)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn log_failure<F>(task: &'static str, future: F)
where
    F: Future<Output = Result<(), InteractionError>>,
{
    if let Err(error) = future.await {
        warn!(task, %error, "background task failed");
    }
}

/// Keeps a freshly connected link unless it was disconnected while the
/// connect was in flight, in which case the link is released again.
async fn adopt_link<D, F>(cancel: &CancellationToken, device: &DeviceId, disconnect: D) -> bool
where
    D: FnOnce() -> F,
    F: Future<Output = btleplug::Result<()>>,
{
    if !cancel.is_cancelled() {
        return true;
    }
    debug!(device = %device, "link cancelled while connecting, releasing it");
    if let Err(error) = disconnect().await {
        debug!(device = %device, %error, "failed to release cancelled link");
    }
    false
}
