use super::scan::ScanFilters;
use super::topology::ServiceInfo;
use super::types::{ConnectionHandle, DeviceId, GattStatus};
use super::value::WriteMode;
use crate::error::TransportError;

/// Commands the core issues to the radio.
///
/// Every method returns immediately. `Ok` means the request was accepted; its
/// result arrives later as a [`TransportEvent`]. `Err` is a synchronous
/// refusal and no event follows it.
pub trait Transport: Send {
    fn start_scan(&mut self, filters: &ScanFilters) -> Result<(), TransportError>;

    fn stop_scan(&mut self);

    fn connect(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError>;

    /// Releases the link. No completion event is required.
    fn disconnect(&mut self, handle: &ConnectionHandle);

    fn discover_services(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError>;

    fn read_characteristic(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
    ) -> Result<(), TransportError>;

    fn write_characteristic(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError>;

    /// Locally starts or stops delivering value changes for a characteristic.
    fn set_notification_delivery(
        &mut self,
        handle: &ConnectionHandle,
        uuid: &str,
        enable: bool,
    ) -> Result<(), TransportError>;

    fn write_descriptor(
        &mut self,
        handle: &ConnectionHandle,
        characteristic_uuid: &str,
        descriptor_uuid: &str,
        value: &[u8],
    ) -> Result<(), TransportError>;

    fn request_mtu(&mut self, handle: &ConnectionHandle, mtu: u16) -> Result<(), TransportError>;
}

/// Asynchronous callbacks delivered by the radio.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    ScanResult {
        device: DeviceId,
        name: Option<String>,
        services: Vec<String>,
    },
    ScanFailed {
        code: u16,
    },
    ConnectionStateChanged {
        handle: ConnectionHandle,
        status: GattStatus,
        connected: bool,
    },
    ServicesDiscovered {
        handle: ConnectionHandle,
        status: GattStatus,
        services: Vec<ServiceInfo>,
    },
    CharacteristicRead {
        handle: ConnectionHandle,
        uuid: String,
        status: GattStatus,
        value: Vec<u8>,
    },
    CharacteristicWritten {
        handle: ConnectionHandle,
        uuid: String,
        status: GattStatus,
    },
    DescriptorWritten {
        handle: ConnectionHandle,
        characteristic_uuid: String,
        descriptor_uuid: String,
        status: GattStatus,
    },
    CharacteristicChanged {
        handle: ConnectionHandle,
        uuid: String,
        value: Vec<u8>,
    },
    MtuChanged {
        handle: ConnectionHandle,
        mtu: u16,
        status: GattStatus,
    },
}

impl TransportEvent {
    /// Returns the connection this event belongs to, if it is connection scoped.
    #[must_use]
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        match self {
            Self::ScanResult { .. } | Self::ScanFailed { .. } => None,
            Self::ConnectionStateChanged { handle, .. }
            | Self::ServicesDiscovered { handle, .. }
            | Self::CharacteristicRead { handle, .. }
            | Self::CharacteristicWritten { handle, .. }
            | Self::DescriptorWritten { handle, .. }
            | Self::CharacteristicChanged { handle, .. }
            | Self::MtuChanged { handle, .. } => Some(handle),
        }
    }
}
