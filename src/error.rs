use thiserror::Error;

use crate::gatt::{DeviceId, GattStatus};

/// Precondition failures detected before any transport call is made.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum OperationError {
    #[error("no BLE adapter is available")]
    TransportUnavailable,
    #[error("device `{device}` is not connected and ready")]
    NotConnected { device: DeviceId },
    #[error("`{uuid}` was not found on device `{device}`")]
    NotFound { device: DeviceId, uuid: String },
    #[error("no scanned device is named `{name}`")]
    UnknownDevice { name: String },
    #[error("characteristic `{uuid}` does not support {operation}")]
    UnsupportedOperation {
        uuid: String,
        operation: &'static str,
    },
    #[error("the transport refused the request for `{target}`: {reason}")]
    TransportRejected { target: String, reason: String },
    #[error("characteristic `{uuid}` does not expose a client configuration descriptor")]
    DescriptorMissing { uuid: String },
    #[error("the BLE service task has stopped")]
    ServiceStopped,
}

impl OperationError {
    /// Maps a synchronous transport refusal for `target`.
    pub(crate) fn from_transport(target: &str, error: TransportError) -> Self {
        match error {
            TransportError::Unavailable => Self::TransportUnavailable,
            error => Self::TransportRejected {
                target: target.to_string(),
                reason: error.to_string(),
            },
        }
    }
}

/// Failures reported asynchronously by the transport.
///
/// The `Display` text is the human-readable reason carried by error events.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum GattError {
    #[error("Connection Error {status} encountered for {device}! Disconnecting...")]
    ConnectionError { status: GattStatus, device: DeviceId },
    #[error("Service discovery found no services on {device}")]
    ServiceDiscoveryEmpty { device: DeviceId },
    #[error("Write exceeded connection ATT MTU!")]
    InvalidAttributeLength,
    #[error("Write not permitted for {uuid}")]
    WriteNotPermitted { uuid: String },
    #[error("Read not permitted for {uuid}")]
    ReadNotPermitted { uuid: String },
    #[error("Characteristic read failed for {uuid}, error: {status}")]
    ReadFailed { uuid: String, status: GattStatus },
    #[error("Characteristic write failed for {uuid}, error: {status}")]
    WriteFailed { uuid: String, status: GattStatus },
    #[error("Descriptor write failed for {uuid}, error: {status}")]
    DescriptorWriteFailed { uuid: String, status: GattStatus },
    #[error("Scan Failed: code {code}")]
    ScanFailed { code: u16 },
    #[error("MTU request failed for {device}, error: {status}")]
    MtuFailed { device: DeviceId, status: GattStatus },
}

impl GattError {
    /// Maps a read completion status to its error, if any.
    pub(crate) fn for_read(uuid: &str, status: GattStatus) -> Option<Self> {
        match status {
            GattStatus::Success => None,
            GattStatus::ReadNotPermitted => Some(Self::ReadNotPermitted {
                uuid: uuid.to_string(),
            }),
            status => Some(Self::ReadFailed {
                uuid: uuid.to_string(),
                status,
            }),
        }
    }

    /// Maps a write completion status to its error, if any.
    pub(crate) fn for_write(uuid: &str, status: GattStatus) -> Option<Self> {
        match status {
            GattStatus::Success => None,
            GattStatus::InvalidAttributeLength => Some(Self::InvalidAttributeLength),
            GattStatus::WriteNotPermitted => Some(Self::WriteNotPermitted {
                uuid: uuid.to_string(),
            }),
            status => Some(Self::WriteFailed {
                uuid: uuid.to_string(),
                status,
            }),
        }
    }
}

/// Synchronous refusal of a transport command.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum TransportError {
    #[error("no adapter is available")]
    Unavailable,
    #[error("the transport does not support this operation")]
    Unsupported,
    #[error("the transport rejected the request: {0}")]
    Rejected(String),
}

/// Errors returned by BLE backends and the command-line front end.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),
    #[error("no BLE adapters were found")]
    NoAdapters,
    #[error("peripheral `{device}` is not known to the adapter")]
    UnknownPeripheral { device: DeviceId },
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("{message}")]
    Reported { message: String },
    #[error("device `{device}` disconnected before the operation finished")]
    Disconnected { device: DeviceId },
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        what: &'static str,
        waited: std::time::Duration,
    },
    #[error("the event stream closed unexpectedly")]
    EventStreamClosed,
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: std::io::Error },
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Errors returned when parsing fake backend fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake discovery fixture is empty")]
    EmptyFixture,
    #[error("fixture records must contain two pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("fixture records cannot have an empty address")]
    EmptyAddress,
    #[error("invalid hex payload")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned when validating command-line options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("missing fake scan fixture while fake mode is enabled")]
    MissingFakeScanFixture,
    #[error("`{value}` is not a valid {encoding} value")]
    InvalidWriteValue {
        value: String,
        encoding: &'static str,
    },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;

    #[test]
    fn connection_error_message_names_status_and_device() {
        let error = GattError::ConnectionError {
            status: GattStatus::Failure(133),
            device: DeviceId::from("AA:BB:CC:DD:EE:FF"),
        };
        assert_snapshot!(
            error.to_string(),
            @"Connection Error 133 encountered for AA:BB:CC:DD:EE:FF! Disconnecting..."
        );
    }

    #[test]
    fn scan_failure_message_carries_code() {
        assert_snapshot!(GattError::ScanFailed { code: 2 }.to_string(), @"Scan Failed: code 2");
    }

    #[rstest]
    #[case(GattStatus::InvalidAttributeLength, "Write exceeded connection ATT MTU!")]
    #[case(GattStatus::WriteNotPermitted, "Write not permitted for 1234")]
    #[case(GattStatus::Failure(257), "Characteristic write failed for 1234, error: 257")]
    fn write_status_maps_to_reason(#[case] status: GattStatus, #[case] expected: &str) {
        let error = GattError::for_write("1234", status).expect("non-success should map");
        pretty_assertions::assert_eq!(expected, error.to_string());
    }

    #[test]
    fn successful_statuses_map_to_no_error() {
        assert_matches!(GattError::for_read("1234", GattStatus::Success), None);
        assert_matches!(GattError::for_write("1234", GattStatus::Success), None);
    }

    #[test]
    fn read_not_permitted_is_distinct_from_generic_failure() {
        assert_matches!(
            GattError::for_read("1234", GattStatus::ReadNotPermitted),
            Some(GattError::ReadNotPermitted { .. })
        );
        assert_matches!(
            GattError::for_read("1234", GattStatus::Failure(133)),
            Some(GattError::ReadFailed { .. })
        );
    }
}
