use serde::Serialize;
use strum_macros::IntoStaticStr;
use tokio::sync::mpsc;
use tracing::trace;

use super::types::DeviceId;

/// Notifications reported to the caller for every state change and result.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, IntoStaticStr)]
#[serde(tag = "event", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BleEvent {
    DeviceFound {
        name: String,
        device: DeviceId,
    },
    DeviceConnected {
        device: DeviceId,
        name: Option<String>,
    },
    DeviceDisconnected {
        device: DeviceId,
    },
    ConnectionError {
        message: String,
        device: DeviceId,
    },
    ServiceDiscoverySuccess {
        device: DeviceId,
    },
    ServiceDiscoveryFailed {
        device: DeviceId,
        message: String,
    },
    CharacteristicRead {
        device: DeviceId,
        uuid: String,
        value: Vec<u8>,
    },
    CharacteristicReadError {
        device: DeviceId,
        uuid: String,
        message: String,
    },
    CharacteristicWritten {
        device: DeviceId,
        uuid: String,
    },
    CharacteristicWriteError {
        device: DeviceId,
        uuid: String,
        message: String,
    },
    CharacteristicChanged {
        device: DeviceId,
        uuid: String,
        value: Vec<u8>,
    },
    NotificationsUpdated {
        device: DeviceId,
        uuid: String,
        enabled: bool,
    },
    NotificationError {
        device: DeviceId,
        uuid: String,
        message: String,
    },
    ScanFailed {
        message: String,
    },
    MtuChanged {
        device: DeviceId,
        mtu: u16,
    },
    MtuChangeFailed {
        device: DeviceId,
        message: String,
    },
}

impl BleEvent {
    /// Returns the snake-case event name, e.g. `device_found`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns the device the event refers to, if any.
    #[must_use]
    pub fn device(&self) -> Option<&DeviceId> {
        match self {
            Self::ScanFailed { .. } => None,
            Self::DeviceFound { device, .. }
            | Self::DeviceConnected { device, .. }
            | Self::DeviceDisconnected { device }
            | Self::ConnectionError { device, .. }
            | Self::ServiceDiscoverySuccess { device }
            | Self::ServiceDiscoveryFailed { device, .. }
            | Self::CharacteristicRead { device, .. }
            | Self::CharacteristicReadError { device, .. }
            | Self::CharacteristicWritten { device, .. }
            | Self::CharacteristicWriteError { device, .. }
            | Self::CharacteristicChanged { device, .. }
            | Self::NotificationsUpdated { device, .. }
            | Self::NotificationError { device, .. }
            | Self::MtuChanged { device, .. }
            | Self::MtuChangeFailed { device, .. } => Some(device),
        }
    }
}

/// Receiver of [`BleEvent`]s.
pub trait EventSink: Send {
    fn emit(&self, event: BleEvent);
}

impl EventSink for mpsc::UnboundedSender<BleEvent> {
    fn emit(&self, event: BleEvent) {
        if let Err(error) = self.send(event) {
            trace!(event = error.0.name(), "event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(BleEvent::DeviceFound { name: String::new(), device: DeviceId::from("a") }, "device_found")]
    #[case(BleEvent::ServiceDiscoverySuccess { device: DeviceId::from("a") }, "service_discovery_success")]
    #[case(BleEvent::MtuChanged { device: DeviceId::from("a"), mtu: 23 }, "mtu_changed")]
    fn event_names_are_snake_case(#[case] event: BleEvent, #[case] expected: &str) {
        assert_eq!(expected, event.name());
    }

    #[test]
    fn events_serialise_with_tag() {
        let event = BleEvent::CharacteristicWritten {
            device: DeviceId::from("AA:BB"),
            uuid: "1234".to_string(),
        };
        let json = serde_json::to_value(&event).expect("event should serialise");

        assert_eq!(
            serde_json::json!({"event": "characteristic_written", "device": "AA:BB", "uuid": "1234"}),
            json
        );
    }
}
