use std::collections::HashMap;

use tracing::{debug, instrument, trace, warn};

use super::connection::{Connection, ConnectionState};
use super::event::{BleEvent, EventSink};
use super::properties::{CCCD_UUID, CharacteristicProperties};
use super::queue::{GattOperation, OperationOutcome};
use super::scan::{PeripheralRecord, ScanFilters, ScanSession};
use super::topology::{CachedCharacteristic, ServiceInfo};
use super::transport::{Transport, TransportEvent};
use super::types::{ConnectionHandle, DeviceId, GATT_ERROR, GattStatus, canonical_uuid};
use super::value::CharacteristicValue;
use crate::error::{GattError, OperationError, TransportError};

/// Owns every device connection and the scan session.
///
/// Caller requests return immediately. Transport results are fed back through
/// [`ConnectionManager::handle_transport_event`] and reported to the
/// [`EventSink`], exactly one terminal event per accepted request.
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    sink: Box<dyn EventSink>,
    scan: ScanSession,
    connections: HashMap<DeviceId, Connection>,
    next_generation: u64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, sink: Box<dyn EventSink>) -> Self {
        Self {
            transport,
            sink,
            scan: ScanSession::default(),
            connections: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Starts a new scan session, replacing any running one.
    #[instrument(skip(self), level = "debug")]
    pub fn start_scan(&mut self, filters: ScanFilters) -> Result<(), OperationError> {
        if self.scan.stop() {
            self.transport.stop_scan();
        }
        self.transport
            .start_scan(&filters)
            .map_err(|error| OperationError::from_transport("scan", error))?;
        self.scan.start(filters);
        debug!("scan started");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    pub fn stop_scan(&mut self) {
        if self.scan.stop() {
            self.transport.stop_scan();
            debug!("scan stopped");
        }
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scan.is_active()
    }

    /// Peripherals recorded by the most recent scan session.
    #[must_use]
    pub fn scan_results(&self) -> &[PeripheralRecord] {
        self.scan.records()
    }

    /// Starts connecting to `device`.
    ///
    /// A device that already has a connection is left alone and its current
    /// state is returned.
    #[instrument(skip(self), fields(device = %device), level = "debug")]
    pub fn connect(&mut self, device: &DeviceId) -> Result<ConnectionState, OperationError> {
        if let Some(connection) = self.connections.get(device) {
            debug!(state = %connection.state(), "connection already exists");
            return Ok(connection.state());
        }

        self.next_generation += 1;
        let handle = ConnectionHandle::new(device.clone(), self.next_generation);
        let name = self
            .scan
            .find(device)
            .and_then(PeripheralRecord::name)
            .map(str::to_string);
        self.transport
            .connect(&handle)
            .map_err(|error| OperationError::from_transport(device.as_str(), error))?;
        self.connections
            .insert(device.clone(), Connection::connecting(handle, name));
        Ok(ConnectionState::Connecting)
    }

    /// Connects to the first peripheral of the last scan advertising `name`.
    #[instrument(skip(self), level = "debug")]
    pub fn connect_by_name(&mut self, name: &str) -> Result<DeviceId, OperationError> {
        let device = self
            .scan
            .find_by_name(name)
            .map(|record| record.device().clone())
            .ok_or_else(|| OperationError::UnknownDevice {
                name: name.to_string(),
            })?;
        self.connect(&device)?;
        Ok(device)
    }

    /// Tears down the connection to `device`. Returns `false` when there was
    /// nothing to tear down.
    #[instrument(skip(self), fields(device = %device), level = "debug")]
    pub fn disconnect(&mut self, device: &DeviceId) -> bool {
        let Some(mut connection) = self.connections.remove(device) else {
            return false;
        };
        if let Err(illegal) = connection.begin_disconnect() {
            debug!(from = %illegal.from, "connection was not live");
        }
        self.close(
            connection,
            BleEvent::DeviceDisconnected {
                device: device.clone(),
            },
        );
        true
    }

    /// Stops scanning and disconnects every device.
    pub fn shutdown(&mut self) {
        self.stop_scan();
        let devices: Vec<DeviceId> = self.connections.keys().cloned().collect();
        for device in devices {
            self.disconnect(&device);
        }
    }

    #[must_use]
    pub fn connection_state(&self, device: &DeviceId) -> ConnectionState {
        self.connections
            .get(device)
            .map_or(ConnectionState::Disconnected, Connection::state)
    }

    #[must_use]
    pub fn is_connected(&self, device: &DeviceId) -> bool {
        self.connection_state(device).is_link_up()
    }

    #[must_use]
    pub fn has_service(&self, device: &DeviceId, uuid: &str) -> bool {
        self.ready(device)
            .is_some_and(|connection| connection.topology().has_service(uuid))
    }

    #[must_use]
    pub fn has_characteristic(&self, device: &DeviceId, uuid: &str) -> bool {
        self.ready(device)
            .is_some_and(|connection| connection.topology().has_characteristic(uuid))
    }

    /// The discovered service tree, sorted by UUID. Empty unless ready.
    #[must_use]
    pub fn services(&self, device: &DeviceId) -> Vec<ServiceInfo> {
        self.ready(device)
            .map(|connection| connection.topology().services())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn properties(&self, device: &DeviceId, uuid: &str) -> Option<CharacteristicProperties> {
        self.cached(device, uuid)
            .map(|characteristic| characteristic.properties)
    }

    #[must_use]
    pub fn is_readable(&self, device: &DeviceId, uuid: &str) -> bool {
        self.properties(device, uuid)
            .is_some_and(|properties| properties.readable)
    }

    #[must_use]
    pub fn is_writable(&self, device: &DeviceId, uuid: &str) -> bool {
        self.properties(device, uuid)
            .is_some_and(|properties| properties.writable)
    }

    #[must_use]
    pub fn is_writable_no_response(&self, device: &DeviceId, uuid: &str) -> bool {
        self.properties(device, uuid)
            .is_some_and(|properties| properties.writable_without_response)
    }

    #[must_use]
    pub fn is_notifiable(&self, device: &DeviceId, uuid: &str) -> bool {
        self.properties(device, uuid)
            .is_some_and(|properties| properties.notifiable)
    }

    #[must_use]
    pub fn is_indicatable(&self, device: &DeviceId, uuid: &str) -> bool {
        self.properties(device, uuid)
            .is_some_and(|properties| properties.indicatable)
    }

    /// Last value read from or notified by the characteristic.
    #[must_use]
    pub fn cached_value(&self, device: &DeviceId, uuid: &str) -> Option<&[u8]> {
        self.cached(device, uuid)
            .and_then(|characteristic| characteristic.cached_value.as_deref())
    }

    /// Negotiated MTU, once a request has succeeded.
    #[must_use]
    pub fn mtu(&self, device: &DeviceId) -> Option<u16> {
        self.ready(device).and_then(Connection::mtu)
    }

    #[instrument(skip(self), fields(device = %device), level = "debug")]
    pub fn read_characteristic(
        &mut self,
        device: &DeviceId,
        uuid: &str,
    ) -> Result<OperationOutcome, OperationError> {
        let connection = ready_mut(&mut self.connections, device)?;
        let characteristic = lookup(connection, uuid)?;
        if !characteristic.properties.readable {
            return Err(unsupported(characteristic, "read"));
        }
        let operation = GattOperation::Read {
            uuid: characteristic.uuid.clone(),
        };
        submit(self.transport.as_mut(), self.sink.as_ref(), connection, operation)
    }

    /// Encodes `value` and writes it.
    pub fn write_characteristic(
        &mut self,
        device: &DeviceId,
        uuid: &str,
        value: &CharacteristicValue,
    ) -> Result<OperationOutcome, OperationError> {
        self.write_bytes(device, uuid, value.encode())
    }

    /// Writes a raw payload, preferring write-with-response when available.
    #[instrument(skip(self, payload), fields(device = %device, len = payload.len()), level = "debug")]
    pub fn write_bytes(
        &mut self,
        device: &DeviceId,
        uuid: &str,
        payload: Vec<u8>,
    ) -> Result<OperationOutcome, OperationError> {
        let connection = ready_mut(&mut self.connections, device)?;
        let characteristic = lookup(connection, uuid)?;
        let Some(mode) = characteristic.properties.preferred_write_mode() else {
            return Err(unsupported(characteristic, "write"));
        };
        let operation = GattOperation::Write {
            uuid: characteristic.uuid.clone(),
            payload,
            mode,
        };
        submit(self.transport.as_mut(), self.sink.as_ref(), connection, operation)
    }

    /// Enables or disables notifications (or indications) for a characteristic.
    ///
    /// Local delivery is switched synchronously; the descriptor write goes
    /// through the operation queue and completes with `notifications_updated`
    /// or `notification_error`.
    #[instrument(skip(self), fields(device = %device), level = "debug")]
    pub fn set_notifications(
        &mut self,
        device: &DeviceId,
        uuid: &str,
        enable: bool,
    ) -> Result<OperationOutcome, OperationError> {
        let connection = ready_mut(&mut self.connections, device)?;
        let characteristic = lookup(connection, uuid)?;
        let Some(value) = characteristic.properties.subscription_payload(enable) else {
            return Err(unsupported(characteristic, "notifications"));
        };
        let uuid = characteristic.uuid.clone();
        let has_cccd = characteristic.has_descriptor(CCCD_UUID);

        self.transport
            .set_notification_delivery(connection.handle(), &uuid, enable)
            .map_err(|error| OperationError::from_transport(&uuid, error))?;
        if !has_cccd {
            return Err(OperationError::DescriptorMissing { uuid });
        }

        let operation = GattOperation::DescriptorWrite {
            characteristic_uuid: uuid,
            descriptor_uuid: canonical_uuid(CCCD_UUID),
            value,
            enable,
        };
        submit(self.transport.as_mut(), self.sink.as_ref(), connection, operation)
    }

    /// Asks for a larger MTU. The outcome arrives as `mtu_changed` or
    /// `mtu_change_failed` and does not occupy the operation queue.
    #[instrument(skip(self), fields(device = %device), level = "debug")]
    pub fn request_mtu(&mut self, device: &DeviceId, mtu: u16) -> Result<(), OperationError> {
        let connection = ready_mut(&mut self.connections, device)?;
        self.transport
            .request_mtu(connection.handle(), mtu)
            .map_err(|error| OperationError::from_transport(device.as_str(), error))
    }

    /// Applies one transport callback.
    ///
    /// Connection-scoped events whose handle does not match a live connection
    /// are dropped.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ScanResult {
                device,
                name,
                services,
            } => self.on_scan_result(device, name, &services),
            TransportEvent::ScanFailed { code } => self.on_scan_failed(code),
            TransportEvent::ConnectionStateChanged {
                handle,
                status,
                connected,
            } => self.on_connection_state(&handle, status, connected),
            TransportEvent::ServicesDiscovered {
                handle,
                status,
                services,
            } => self.on_services_discovered(&handle, status, &services),
            TransportEvent::CharacteristicRead {
                handle,
                uuid,
                status,
                value,
            } => self.on_read(&handle, &uuid, status, value),
            TransportEvent::CharacteristicWritten {
                handle,
                uuid,
                status,
            } => self.on_written(&handle, &uuid, status),
            TransportEvent::DescriptorWritten {
                handle,
                characteristic_uuid,
                descriptor_uuid,
                status,
            } => self.on_descriptor_written(&handle, &characteristic_uuid, &descriptor_uuid, status),
            TransportEvent::CharacteristicChanged {
                handle,
                uuid,
                value,
            } => self.on_changed(&handle, &uuid, value),
            TransportEvent::MtuChanged {
                handle,
                mtu,
                status,
            } => self.on_mtu_changed(&handle, mtu, status),
        }
    }

    fn on_scan_result(&mut self, device: DeviceId, name: Option<String>, services: &[String]) {
        if let Some(record) = self.scan.on_discovery(device, name, services) {
            debug!(device = %record.device(), name = ?record.name(), "device found");
            self.sink.emit(BleEvent::DeviceFound {
                name: record.name().unwrap_or_default().to_string(),
                device: record.device().clone(),
            });
        }
    }

    fn on_scan_failed(&mut self, code: u16) {
        if !self.scan.stop() {
            trace!(code, "dropping scan failure without an active scan");
            return;
        }
        warn!(code, "scan failed");
        self.sink.emit(BleEvent::ScanFailed {
            message: GattError::ScanFailed { code }.to_string(),
        });
    }

    fn on_connection_state(&mut self, handle: &ConnectionHandle, status: GattStatus, connected: bool) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        let device = handle.device().clone();

        if !status.is_success() {
            warn!(device = %device, %status, "connection error");
            let message = GattError::ConnectionError {
                status,
                device: device.clone(),
            }
            .to_string();
            self.remove_and_close(&device, BleEvent::ConnectionError { message, device: device.clone() });
            return;
        }

        if !connected {
            self.remove_and_close(&device, BleEvent::DeviceDisconnected { device: device.clone() });
            return;
        }

        if let Err(illegal) = connection.on_link_up() {
            debug!(device = %device, from = %illegal.from, "ignoring repeated connected report");
            return;
        }
        self.sink.emit(BleEvent::DeviceConnected {
            device: device.clone(),
            name: connection.name().map(str::to_string),
        });

        if let Err(illegal) = connection.begin_discovery() {
            debug!(device = %device, from = %illegal.from, "discovery not started");
            return;
        }
        if let Err(error) = self.transport.discover_services(connection.handle()) {
            warn!(device = %device, %error, "service discovery could not start");
            let message = GattError::ConnectionError {
                status: GattStatus::from_code(GATT_ERROR),
                device: device.clone(),
            }
            .to_string();
            self.remove_and_close(&device, BleEvent::ConnectionError { message, device: device.clone() });
        }
    }

    fn on_services_discovered(
        &mut self,
        handle: &ConnectionHandle,
        status: GattStatus,
        services: &[ServiceInfo],
    ) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        let device = handle.device().clone();
        if connection.state() != ConnectionState::DiscoveringServices {
            debug!(device = %device, state = %connection.state(), "ignoring unexpected service discovery");
            return;
        }

        let failure = if !status.is_success() {
            Some(GattError::ConnectionError {
                status,
                device: device.clone(),
            })
        } else if services.is_empty() {
            Some(GattError::ServiceDiscoveryEmpty {
                device: device.clone(),
            })
        } else {
            None
        };
        if let Some(error) = failure {
            warn!(device = %device, %error, "service discovery failed");
            self.remove_and_close(
                &device,
                BleEvent::ServiceDiscoveryFailed {
                    device: device.clone(),
                    message: error.to_string(),
                },
            );
            return;
        }

        if let Err(illegal) = connection.on_services_discovered(services) {
            debug!(device = %device, from = %illegal.from, "discovery result not applied");
            return;
        }
        debug!(device = %device, services = services.len(), "services discovered");
        self.sink.emit(BleEvent::ServiceDiscoverySuccess { device });
    }

    fn on_read(&mut self, handle: &ConnectionHandle, uuid: &str, status: GattStatus, value: Vec<u8>) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        if !completes_in_flight(connection, "read", uuid) {
            warn!(device = %handle.device(), uuid, "read completion does not match the operation in flight");
            return;
        }

        let uuid = canonical_uuid(uuid);
        let device = handle.device().clone();
        let event = match GattError::for_read(&uuid, status) {
            None => {
                if let Some(characteristic) = connection.topology_mut().characteristic_mut(&uuid) {
                    characteristic.cached_value = Some(value.clone());
                }
                BleEvent::CharacteristicRead { device, uuid, value }
            }
            Some(error) => {
                warn!(device = %device, %error, "characteristic read failed");
                BleEvent::CharacteristicReadError {
                    device,
                    uuid,
                    message: error.to_string(),
                }
            }
        };
        self.sink.emit(event);
        advance(self.transport.as_mut(), self.sink.as_ref(), connection);
    }

    fn on_written(&mut self, handle: &ConnectionHandle, uuid: &str, status: GattStatus) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        if !completes_in_flight(connection, "write", uuid) {
            warn!(device = %handle.device(), uuid, "write completion does not match the operation in flight");
            return;
        }

        let uuid = canonical_uuid(uuid);
        let device = handle.device().clone();
        let event = match GattError::for_write(&uuid, status) {
            None => BleEvent::CharacteristicWritten { device, uuid },
            Some(error) => {
                warn!(device = %device, %error, "characteristic write failed");
                BleEvent::CharacteristicWriteError {
                    device,
                    uuid,
                    message: error.to_string(),
                }
            }
        };
        self.sink.emit(event);
        advance(self.transport.as_mut(), self.sink.as_ref(), connection);
    }

    fn on_descriptor_written(
        &mut self,
        handle: &ConnectionHandle,
        characteristic_uuid: &str,
        descriptor_uuid: &str,
        status: GattStatus,
    ) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        let Some(GattOperation::DescriptorWrite {
            characteristic_uuid: expected,
            descriptor_uuid: expected_descriptor,
            enable,
            ..
        }) = connection.queue().in_flight()
        else {
            warn!(device = %handle.device(), characteristic_uuid, "no descriptor write in flight");
            return;
        };
        if *expected != canonical_uuid(characteristic_uuid)
            || *expected_descriptor != canonical_uuid(descriptor_uuid)
        {
            warn!(device = %handle.device(), characteristic_uuid, "descriptor completion does not match the operation in flight");
            return;
        }

        let enabled = *enable;
        let uuid = canonical_uuid(characteristic_uuid);
        let device = handle.device().clone();
        let event = if status.is_success() {
            BleEvent::NotificationsUpdated {
                device,
                uuid,
                enabled,
            }
        } else {
            let error = GattError::DescriptorWriteFailed {
                uuid: uuid.clone(),
                status,
            };
            warn!(device = %device, %error, "notification subscription failed");
            BleEvent::NotificationError {
                device,
                uuid,
                message: error.to_string(),
            }
        };
        self.sink.emit(event);
        advance(self.transport.as_mut(), self.sink.as_ref(), connection);
    }

    fn on_changed(&mut self, handle: &ConnectionHandle, uuid: &str, value: Vec<u8>) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        if !connection.is_ready() {
            trace!(device = %handle.device(), uuid, "dropping notification before ready");
            return;
        }

        let uuid = canonical_uuid(uuid);
        if let Some(characteristic) = connection.topology_mut().characteristic_mut(&uuid) {
            characteristic.cached_value = Some(value.clone());
        }
        self.sink.emit(BleEvent::CharacteristicChanged {
            device: handle.device().clone(),
            uuid,
            value,
        });
    }

    fn on_mtu_changed(&mut self, handle: &ConnectionHandle, mtu: u16, status: GattStatus) {
        let Some(connection) = live(&mut self.connections, handle) else {
            return;
        };
        let device = handle.device().clone();
        if status.is_success() {
            connection.set_mtu(mtu);
            debug!(device = %device, mtu, "mtu changed");
            self.sink.emit(BleEvent::MtuChanged { device, mtu });
        } else {
            let message = GattError::MtuFailed {
                device: device.clone(),
                status,
            }
            .to_string();
            warn!(device = %device, %status, "mtu request failed");
            self.sink.emit(BleEvent::MtuChangeFailed { device, message });
        }
    }

    fn ready(&self, device: &DeviceId) -> Option<&Connection> {
        self.connections
            .get(device)
            .filter(|connection| connection.is_ready())
    }

    fn cached(&self, device: &DeviceId, uuid: &str) -> Option<&CachedCharacteristic> {
        self.ready(device)
            .and_then(|connection| connection.topology().characteristic(uuid))
    }

    fn remove_and_close(&mut self, device: &DeviceId, event: BleEvent) {
        if let Some(connection) = self.connections.remove(device) {
            self.close(connection, event);
        }
    }

    fn close(&mut self, mut connection: Connection, event: BleEvent) {
        self.transport.disconnect(connection.handle());
        let dropped = connection.teardown();
        if dropped > 0 {
            debug!(device = %connection.device(), dropped, "discarded pending operations");
        }
        self.sink.emit(event);
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("scan", &self.scan)
            .field("connections", &self.connections)
            .field("next_generation", &self.next_generation)
            .finish_non_exhaustive()
    }
}

fn ready_mut<'a>(
    connections: &'a mut HashMap<DeviceId, Connection>,
    device: &DeviceId,
) -> Result<&'a mut Connection, OperationError> {
    connections
        .get_mut(device)
        .filter(|connection| connection.is_ready())
        .ok_or_else(|| OperationError::NotConnected {
            device: device.clone(),
        })
}

fn live<'a>(
    connections: &'a mut HashMap<DeviceId, Connection>,
    handle: &ConnectionHandle,
) -> Option<&'a mut Connection> {
    match connections.get_mut(handle.device()) {
        Some(connection) if connection.handle() == handle => Some(connection),
        _ => {
            trace!(
                device = %handle.device(),
                generation = handle.generation(),
                "dropping stale transport event"
            );
            None
        }
    }
}

fn lookup<'a>(connection: &'a Connection, uuid: &str) -> Result<&'a CachedCharacteristic, OperationError> {
    connection
        .topology()
        .characteristic(uuid)
        .ok_or_else(|| OperationError::NotFound {
            device: connection.device().clone(),
            uuid: uuid.to_string(),
        })
}

fn unsupported(characteristic: &CachedCharacteristic, operation: &'static str) -> OperationError {
    OperationError::UnsupportedOperation {
        uuid: characteristic.uuid.clone(),
        operation,
    }
}

fn completes_in_flight(connection: &Connection, kind: &str, uuid: &str) -> bool {
    connection.queue().in_flight().is_some_and(|operation| {
        operation.kind() == kind && operation.characteristic_uuid() == canonical_uuid(uuid)
    })
}

fn send(
    transport: &mut dyn Transport,
    handle: &ConnectionHandle,
    operation: &GattOperation,
) -> Result<(), TransportError> {
    match operation {
        GattOperation::Read { uuid } => transport.read_characteristic(handle, uuid),
        GattOperation::Write {
            uuid,
            payload,
            mode,
        } => transport.write_characteristic(handle, uuid, payload, *mode),
        GattOperation::DescriptorWrite {
            characteristic_uuid,
            descriptor_uuid,
            value,
            ..
        } => transport.write_descriptor(handle, characteristic_uuid, descriptor_uuid, value),
    }
}

fn submit(
    transport: &mut dyn Transport,
    sink: &dyn EventSink,
    connection: &mut Connection,
    operation: GattOperation,
) -> Result<OperationOutcome, OperationError> {
    let (outcome, send_now) = connection.queue_mut().enqueue(operation);
    let Some(operation) = send_now else {
        debug!(device = %connection.device(), ?outcome, "operation queued");
        return Ok(outcome);
    };

    if let Err(error) = send(transport, connection.handle(), &operation) {
        let target = operation.characteristic_uuid().to_string();
        advance(transport, sink, connection);
        return Err(OperationError::from_transport(&target, error));
    }
    Ok(outcome)
}

/// Frees the in-flight slot and dispatches queued operations until one is
/// accepted. A queued operation the transport refuses gets its error event.
fn advance(transport: &mut dyn Transport, sink: &dyn EventSink, connection: &mut Connection) {
    let mut next = connection.queue_mut().complete().next;
    while let Some(operation) = next {
        let Err(error) = send(transport, connection.handle(), &operation) else {
            return;
        };
        warn!(device = %connection.device(), kind = operation.kind(), %error, "queued operation refused");
        sink.emit(refusal_event(connection.device(), &operation, &error));
        next = connection.queue_mut().complete().next;
    }
}

fn refusal_event(device: &DeviceId, operation: &GattOperation, error: &TransportError) -> BleEvent {
    let device = device.clone();
    let uuid = operation.characteristic_uuid().to_string();
    let message = error.to_string();
    match operation {
        GattOperation::Read { .. } => BleEvent::CharacteristicReadError {
            device,
            uuid,
            message,
        },
        GattOperation::Write { .. } => BleEvent::CharacteristicWriteError {
            device,
            uuid,
            message,
        },
        GattOperation::DescriptorWrite { .. } => BleEvent::NotificationError {
            device,
            uuid,
            message,
        },
    }
}
