use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use blecentral::{
    BleEvent, BleService, CharacteristicValue, ConnectionState, DeviceId, FakeArgs,
    OperationError, OperationOutcome, ScanFilters,
};

const WAIT: Duration = Duration::from_secs(5);
const MEASUREMENT: &str = "00002a37-0000-1000-8000-00805f9b34fb";
const BODY_SENSOR_LOCATION: &str = "00002a38-0000-1000-8000-00805f9b34fb";
const CUSTOM_DATA: &str = "0000fff1-0000-1000-8000-00805f9b34fb";

async fn start(fake: FakeArgs) -> anyhow::Result<BleService> {
    Ok(BleService::start(blecentral::fake_transport_provider(fake)).await?)
}

async fn ready(service: &mut BleService, device: &DeviceId) -> anyhow::Result<()> {
    service.client().connect(device.clone()).await?;
    service
        .wait_for(WAIT, "service discovery", |event| match event {
            BleEvent::ServiceDiscoverySuccess { .. } => Some(Ok(())),
            BleEvent::ConnectionError { message, .. } => Some(Err(
                blecentral::InteractionError::Reported {
                    message: message.clone(),
                },
            )),
            _ => None,
        })
        .await?;
    Ok(())
}

#[tokio::test]
async fn scan_then_connect_by_name_reaches_ready() -> anyhow::Result<()> {
    let mut service = start(
        FakeArgs::builder()
            .scan_fixture("00:11:22|Speaker;AA:BB:CC|Thermometer")?
            .build(),
    )
    .await?;
    let client = service.client();

    client
        .start_scan(ScanFilters::builder().name("Thermometer").build())
        .await?;
    let found = service
        .wait_for(WAIT, "device found", |event| match event {
            BleEvent::DeviceFound { device, .. } => Some(Ok(device.clone())),
            _ => None,
        })
        .await?;
    client.stop_scan().await?;
    assert_eq!(DeviceId::from("AA:BB:CC"), found);

    let device = client.connect_by_name("Thermometer".to_string()).await?;
    let connected_name = service
        .wait_for(WAIT, "connected", |event| match event {
            BleEvent::DeviceConnected { name, .. } => Some(Ok(name.clone())),
            _ => None,
        })
        .await?;
    service
        .wait_for(WAIT, "service discovery", |event| match event {
            BleEvent::ServiceDiscoverySuccess { .. } => Some(Ok(())),
            _ => None,
        })
        .await?;

    assert_eq!(Some("Thermometer".to_string()), connected_name);
    assert_eq!(ConnectionState::Ready, client.connection_state(device.clone()).await?);
    assert!(client.has_service(device.clone(), "0000180D-0000-1000-8000-00805F9B34FB".to_string()).await?);
    assert!(client.has_characteristic(device, MEASUREMENT.to_string()).await?);

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn rapid_writes_queue_behind_the_in_flight_write() -> anyhow::Result<()> {
    let mut service = start(
        FakeArgs::builder()
            .scan_fixture("AA:BB|Sensor")?
            .latency(Duration::from_millis(20))
            .build(),
    )
    .await?;
    let device = DeviceId::from("AA:BB");
    ready(&mut service, &device).await?;
    let client = service.client();

    let first = client
        .write_characteristic(device.clone(), CUSTOM_DATA.to_string(), CharacteristicValue::Int32(1))
        .await?;
    let second = client
        .write_characteristic(device.clone(), CUSTOM_DATA.to_string(), CharacteristicValue::Int32(2))
        .await?;

    assert_eq!(OperationOutcome::Dispatched, first);
    assert_eq!(OperationOutcome::Queued { position: 1 }, second);

    for _ in 0..2 {
        service
            .wait_for(WAIT, "write completion", |event| match event {
                BleEvent::CharacteristicWritten { .. } => Some(Ok(())),
                _ => None,
            })
            .await?;
    }
    client.read_characteristic(device, CUSTOM_DATA.to_string()).await?;
    let value = service
        .wait_for(WAIT, "read", |event| match event {
            BleEvent::CharacteristicRead { value, .. } => Some(Ok(value.clone())),
            _ => None,
        })
        .await?;

    assert_eq!(vec![0x02, 0x00, 0x00, 0x00], value);
    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn preconditions_fail_synchronously() -> anyhow::Result<()> {
    let mut service = start(FakeArgs::builder().scan_fixture("AA:BB|Sensor")?.build()).await?;
    let device = DeviceId::from("AA:BB");
    let client = service.client();

    assert_matches!(
        client.read_characteristic(device.clone(), BODY_SENSOR_LOCATION.to_string()).await,
        Err(OperationError::NotConnected { .. })
    );

    ready(&mut service, &device).await?;

    assert_matches!(
        client
            .set_notifications(device.clone(), BODY_SENSOR_LOCATION.to_string(), true)
            .await,
        Err(OperationError::UnsupportedOperation { operation: "notifications", .. })
    );
    assert_matches!(
        client
            .write_bytes(device.clone(), BODY_SENSOR_LOCATION.to_string(), vec![1])
            .await,
        Err(OperationError::UnsupportedOperation { operation: "write", .. })
    );
    assert_matches!(
        client.read_characteristic(device, "0000ffff-0000-1000-8000-00805f9b34fb".to_string()).await,
        Err(OperationError::NotFound { .. })
    );

    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn notifications_are_cached_and_reported() -> anyhow::Result<()> {
    let mut service = start(
        FakeArgs::builder()
            .scan_fixture("AA:BB|Sensor")?
            .notifications("0150, 0152")?
            .build(),
    )
    .await?;
    let device = DeviceId::from("AA:BB");
    ready(&mut service, &device).await?;
    let client = service.client();

    client
        .set_notifications(device.clone(), MEASUREMENT.to_string(), true)
        .await?;
    let enabled = service
        .wait_for(WAIT, "notifications updated", |event| match event {
            BleEvent::NotificationsUpdated { enabled, .. } => Some(Ok(*enabled)),
            _ => None,
        })
        .await?;
    let mut values = Vec::new();
    while values.len() < 2 {
        let value = service
            .wait_for(WAIT, "notification", |event| match event {
                BleEvent::CharacteristicChanged { value, .. } => Some(Ok(value.clone())),
                _ => None,
            })
            .await?;
        values.push(value);
    }

    assert!(enabled);
    assert_eq!(vec![vec![0x01, 0x50], vec![0x01, 0x52]], values);
    assert_eq!(
        Some(vec![0x01, 0x52]),
        client.cached_value(device, MEASUREMENT.to_string()).await?
    );
    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn disconnect_clears_connection_state() -> anyhow::Result<()> {
    let mut service = start(FakeArgs::builder().scan_fixture("AA:BB|Sensor")?.build()).await?;
    let device = DeviceId::from("AA:BB");
    ready(&mut service, &device).await?;
    let client = service.client();

    assert!(client.disconnect(device.clone()).await?);
    service
        .wait_for(WAIT, "disconnected", |event| match event {
            BleEvent::DeviceDisconnected { .. } => Some(Ok(())),
            _ => None,
        })
        .await?;

    assert_eq!(ConnectionState::Disconnected, client.connection_state(device.clone()).await?);
    assert_eq!(Vec::<blecentral::ServiceInfo>::new(), client.services(device.clone()).await?);
    assert!(!client.disconnect(device).await?);
    service.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn mtu_request_is_capped_by_the_peripheral() -> anyhow::Result<()> {
    let mut service = start(FakeArgs::builder().scan_fixture("AA:BB|Sensor")?.build()).await?;
    let device = DeviceId::from("AA:BB");
    ready(&mut service, &device).await?;
    let client = service.client();

    client.request_mtu(device.clone(), 600).await?;
    let mtu = service
        .wait_for(WAIT, "mtu", |event| match event {
            BleEvent::MtuChanged { mtu, .. } => Some(Ok(*mtu)),
            _ => None,
        })
        .await?;

    assert_eq!(517, mtu);
    assert_eq!(Some(517), client.mtu(device).await?);
    service.shutdown().await?;
    Ok(())
}
