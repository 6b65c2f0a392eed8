use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;

use bon::Builder;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::error::{FixtureError, TransportError};
use crate::gatt::{
    CharacteristicInfo, ConnectionHandle, DISABLE_NOTIFICATION_VALUE, DeviceId, GATT_ERROR,
    GattStatus, ScanFilters, ServiceInfo, Transport, TransportEvent, WriteMode, canonical_uuid,
};

const DEFAULT_READ: [u8; 4] = [0x2A, 0x00, 0x00, 0x00];
const DEFAULT_NOTIFICATIONS: [[u8; 2]; 3] = [[0x16, 0x48], [0x16, 0x4A], [0x16, 0x4C]];
const MAX_MTU: u16 = 517;

pub(crate) const HEART_RATE_SERVICE: &str = "0000180d-0000-1000-8000-00805f9b34fb";
pub(crate) const HEART_RATE_MEASUREMENT: &str = "00002a37-0000-1000-8000-00805f9b34fb";
pub(crate) const BODY_SENSOR_LOCATION: &str = "00002a38-0000-1000-8000-00805f9b34fb";
pub(crate) const HEART_RATE_CONTROL_POINT: &str = "00002a39-0000-1000-8000-00805f9b34fb";
pub(crate) const CUSTOM_SERVICE: &str = "0000fff0-0000-1000-8000-00805f9b34fb";
pub(crate) const CUSTOM_DATA: &str = "0000fff1-0000-1000-8000-00805f9b34fb";
pub(crate) const CUSTOM_STATUS: &str = "0000fff2-0000-1000-8000-00805f9b34fb";

/// One advertised peripheral in a fake scan fixture.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct FixtureDevice {
    address: String,
    name: Option<String>,
}

/// Parsed fake scan fixture records.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct ScanFixture {
    devices: Vec<FixtureDevice>,
}

impl FromStr for ScanFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let devices = parse_scan_fixture(value)?;
        Ok(Self { devices })
    }
}

/// Parsed fake hex payload.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct HexPayload {
    payload: Vec<u8>,
}

impl FromStr for HexPayload {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let payload = parse_hex(value)?;
        Ok(Self { payload })
    }
}

/// Parsed fake notification payload fixtures.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct NotificationPayloads {
    payloads: Vec<Vec<u8>>,
}

impl FromStr for NotificationPayloads {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let payloads = parse_notifications(value)?;
        Ok(Self { payloads })
    }
}

/// Settings for constructing a fake transport.
#[derive(Debug, Builder)]
pub(crate) struct FakeBackendConfig {
    scan_fixture: ScanFixture,
    read_payload: Option<HexPayload>,
    notifications: Option<NotificationPayloads>,
    #[builder(default)]
    latency: Duration,
}

/// Transport that answers every command from fixtures.
///
/// Each peripheral exposes the same two services. Writes are remembered and
/// returned by later reads of the same characteristic. Enabling notifications
/// replays the notification fixtures once.
#[derive(Debug)]
pub(crate) struct FakeTransport {
    devices: Vec<FixtureDevice>,
    services: Vec<ServiceInfo>,
    read_payload: Vec<u8>,
    notifications: Vec<Vec<u8>>,
    connected: HashMap<DeviceId, ConnectionHandle>,
    values: HashMap<(DeviceId, String), Vec<u8>>,
    delivering: HashSet<(DeviceId, String)>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl FakeTransport {
    /// Creates a fake transport delivering callbacks on `events`.
    ///
    /// With a non-zero latency every callback passes through a relay task that
    /// delays it, keeping the original order.
    pub(crate) fn new(
        config: FakeBackendConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let FakeBackendConfig {
            scan_fixture,
            read_payload,
            notifications,
            latency,
        } = config;

        let events = if latency.is_zero() {
            events
        } else {
            spawn_latency_relay(latency, events)
        };

        Self {
            devices: scan_fixture.into(),
            services: default_services(),
            read_payload: read_payload.map_or_else(|| DEFAULT_READ.to_vec(), Into::into),
            notifications: notifications.map_or_else(
                || DEFAULT_NOTIFICATIONS.map(Vec::from).to_vec(),
                Into::into,
            ),
            connected: HashMap::new(),
            values: HashMap::new(),
            delivering: HashSet::new(),
            events,
        }
    }

    fn send(&self, event: TransportEvent) {
        if let Err(error) = self.events.send(event) {
            trace!(event = ?error.0, "fake transport receiver dropped");
        }
    }

    fn knows(&self, device: &DeviceId) -> bool {
        self.devices
            .iter()
            .any(|fixture| fixture.address.eq_ignore_ascii_case(device.as_str()))
    }

    fn advertised_services(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|service| service.uuid().to_string())
            .collect()
    }
}

impl Transport for FakeTransport {
    fn start_scan(&mut self, _filters: &ScanFilters) -> Result<(), TransportError> {
        let services = self.advertised_services();
        for fixture in &self.devices {
            self.send(TransportEvent::ScanResult {
                device: DeviceId::from(fixture.address.as_str()),
                name: fixture.name.clone(),
                services: services.clone(),
            });
        }
        Ok(())
    }

    fn stop_scan(&mut self) {}

    fn connect(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        let known = self.knows(handle.device());
        if known {
            self.connected
                .insert(handle.device().clone(), handle.clone());
        } else {
            debug!(device = %handle.device(), "fixture has no such device");
        }
        self.send(TransportEvent::ConnectionStateChanged {
            handle: handle.clone(),
            status: if known {
                GattStatus::Success
            } else {
                GattStatus::from_code(GATT_ERROR)
            },
            connected: known,
        });
        Ok(())
    }

    fn disconnect(&mut self, handle: &ConnectionHandle) {
        self.connected.remove(handle.device());
        self.delivering
            .retain(|(device, _)| device != handle.device());
    }

    fn discover_services(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        self.send(TransportEvent::ServicesDiscovered {
            handle: handle.clone(),
            status: GattStatus::Success,
            services: self.services.clone(),
        });
        Ok(())
    }

    fn read_characteristic(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
    ) -> Result<(), TransportError> {
        let value = self
            .values
            .get(&(handle.device().clone(), canonical_uuid(uuid)))
            .cloned()
            .unwrap_or_else(|| self.read_payload.clone());
        self.send(TransportEvent::CharacteristicRead {
            handle: handle.clone(),
            uuid: uuid.to_string(),
            status: GattStatus::Success,
            value,
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
        trace!(uuid, %mode, len = payload.len(), "fake write");
        self.values.insert(
            (handle.device().clone(), canonical_uuid(uuid)),
            payload.to_vec(),
        );
        self.send(TransportEvent::CharacteristicWritten {
            handle: handle.clone(),
            uuid: uuid.to_string(),
            status: GattStatus::Success,
        });
        Ok(())
    }

    fn set_notification_delivery(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
        enable: bool,
    ) -> Result<(), TransportError> {
        let key = (handle.device().clone(), canonical_uuid(uuid));
        if enable {
            self.delivering.insert(key);
        } else {
            self.delivering.remove(&key);
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
        self.send(TransportEvent::DescriptorWritten {
            handle: handle.clone(),
            characteristic_uuid: characteristic_uuid.to_string(),
            descriptor_uuid: descriptor_uuid.to_string(),
            status: GattStatus::Success,
        });

        let key = (handle.device().clone(), canonical_uuid(characteristic_uuid));
        if value != DISABLE_NOTIFICATION_VALUE && self.delivering.contains(&key) {
            for payload in &self.notifications {
                self.send(TransportEvent::CharacteristicChanged {
                    handle: handle.clone(),
                    uuid: characteristic_uuid.to_string(),
                    value: payload.clone(),
                });
            }
        }
        Ok(())
    }

    fn request_mtu(&mut self, handle: &ConnectionHandle, mtu: u16) -> Result<(), TransportError> {
        self.send(TransportEvent::MtuChanged {
            handle: handle.clone(),
            mtu: mtu.min(MAX_MTU),
            status: GattStatus::Success,
        });
        Ok(())
    }
}

fn spawn_latency_relay(
    latency: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> mpsc::UnboundedSender<TransportEvent> {
    let (relay, mut delayed) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = delayed.recv().await {
            sleep(latency).await;
            if events.send(event).is_err() {
                break;
            }
        }
    });
    relay
}

fn default_services() -> Vec<ServiceInfo> {
    vec![
        ServiceInfo::new(
            HEART_RATE_SERVICE,
            true,
            vec![
                CharacteristicInfo::with_cccd(HEART_RATE_MEASUREMENT, 0x10),
                CharacteristicInfo::new(BODY_SENSOR_LOCATION, 0x02, Vec::new()),
                CharacteristicInfo::new(HEART_RATE_CONTROL_POINT, 0x08, Vec::new()),
            ],
        ),
        ServiceInfo::new(
            CUSTOM_SERVICE,
            true,
            vec![
                CharacteristicInfo::with_cccd(CUSTOM_DATA, 0x1E),
                CharacteristicInfo::with_cccd(CUSTOM_STATUS, 0x22),
            ],
        ),
    ]
}

fn parse_scan_fixture(raw_fixture: &str) -> Result<Vec<FixtureDevice>, FixtureError> {
    if raw_fixture.trim().is_empty() {
        return Err(FixtureError::EmptyFixture);
    }

    raw_fixture
        .split(';')
        .map(parse_scan_record)
        .collect::<Result<Vec<_>, _>>()
}

fn parse_scan_record(raw_record: &str) -> Result<FixtureDevice, FixtureError> {
    let fields: Vec<&str> = raw_record.split('|').map(str::trim).collect();
    let [address, name] = fields.as_slice() else {
        return Err(FixtureError::InvalidRecordFieldCount);
    };
    if address.is_empty() {
        return Err(FixtureError::EmptyAddress);
    }

    Ok(FixtureDevice {
        address: (*address).to_string(),
        name: match *name {
            "" | "-" => None,
            name => Some(name.to_string()),
        },
    })
}

fn parse_notifications(raw_value: &str) -> Result<Vec<Vec<u8>>, FixtureError> {
    if raw_value.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw_value.split(',').map(parse_hex).collect()
}

fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(cleaned)?)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn transport(fixture: &str) -> (FakeTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let config = FakeBackendConfig::builder()
            .scan_fixture(fixture.parse().expect("fixture should parse"))
            .build();
        (FakeTransport::new(config, events), receiver)
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[rstest]
    #[case("AA:BB|Sensor", 1)]
    #[case("AA:BB|Sensor;CC:DD|-", 2)]
    #[case(" AA:BB | Sensor ; CC:DD | Thermometer ", 2)]
    fn parse_scan_fixture_parses_records(#[case] fixture: &str, #[case] expected_count: usize) {
        let devices = parse_scan_fixture(fixture).expect("fixture should parse");
        assert_eq!(expected_count, devices.len());
    }

    #[test]
    fn dash_means_no_name() {
        let devices = parse_scan_fixture("AA:BB|-").expect("fixture should parse");
        assert_eq!(None, devices[0].name);
    }

    #[rstest]
    #[case("AA:BB")]
    #[case("AA:BB|Sensor|-40")]
    fn parse_scan_fixture_rejects_invalid_field_count(#[case] fixture: &str) {
        assert_matches!(
            parse_scan_fixture(fixture),
            Err(FixtureError::InvalidRecordFieldCount)
        );
    }

    #[test]
    fn parse_scan_fixture_rejects_blank_address() {
        assert_matches!(parse_scan_fixture("|Sensor"), Err(FixtureError::EmptyAddress));
    }

    #[test]
    fn parse_hex_rejects_odd_length() {
        assert_matches!(parse_hex("A"), Err(FixtureError::InvalidHex(_)));
    }

    #[test]
    fn parse_notifications_splits_on_commas() {
        let payloads = parse_notifications("01 02, 0304").expect("payloads should parse");
        assert_eq!(vec![vec![0x01, 0x02], vec![0x03, 0x04]], payloads);
    }

    #[tokio::test]
    async fn unknown_device_fails_to_connect() {
        let (mut transport, mut receiver) = transport("AA:BB|Sensor");
        let handle = ConnectionHandle::new(DeviceId::from("FF:FF"), 1);

        transport.connect(&handle).expect("connect accepted");

        assert_matches!(
            drain(&mut receiver).as_slice(),
            [TransportEvent::ConnectionStateChanged { connected: false, status, .. }]
                if !status.is_success()
        );
    }

    #[tokio::test]
    async fn reads_return_last_written_value() {
        let (mut transport, mut receiver) = transport("AA:BB|Sensor");
        let handle = ConnectionHandle::new(DeviceId::from("AA:BB"), 1);

        transport
            .write_characteristic(&handle, CUSTOM_DATA, &[9, 9], WriteMode::WithResponse)
            .expect("write accepted");
        transport
            .read_characteristic(&handle, CUSTOM_DATA)
            .expect("read accepted");

        assert_matches!(
            drain(&mut receiver).as_slice(),
            [TransportEvent::CharacteristicWritten { .. }, TransportEvent::CharacteristicRead { value, .. }]
                if *value == vec![9, 9]
        );
    }

    #[tokio::test]
    async fn enabling_delivery_replays_notifications() {
        let (mut transport, mut receiver) = transport("AA:BB|Sensor");
        let handle = ConnectionHandle::new(DeviceId::from("AA:BB"), 1);

        transport
            .set_notification_delivery(&handle, HEART_RATE_MEASUREMENT, true)
            .expect("delivery accepted");
        transport
            .write_descriptor(&handle, HEART_RATE_MEASUREMENT, crate::gatt::CCCD_UUID, &[1, 0])
            .expect("descriptor write accepted");

        let changed = drain(&mut receiver)
            .into_iter()
            .filter(|event| matches!(event, TransportEvent::CharacteristicChanged { .. }))
            .count();
        assert_eq!(DEFAULT_NOTIFICATIONS.len(), changed);
    }
}
