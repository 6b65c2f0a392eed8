use serde::Serialize;

use super::value::WriteMode;

const PROPERTY_READ: u8 = 0x02;
const PROPERTY_WRITE_NO_RESPONSE: u8 = 0x04;
const PROPERTY_WRITE: u8 = 0x08;
const PROPERTY_NOTIFY: u8 = 0x10;
const PROPERTY_INDICATE: u8 = 0x20;

/// Client Characteristic Configuration Descriptor UUID.
pub const CCCD_UUID: &str = "00002902-0000-1000-8000-00805F9B34FB";

/// Value written to the CCCD to enable notifications.
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];
/// Value written to the CCCD to enable indications.
pub const ENABLE_INDICATION_VALUE: [u8; 2] = [0x02, 0x00];
/// Value written to the CCCD to disable notifications and indications.
pub const DISABLE_NOTIFICATION_VALUE: [u8; 2] = [0x00, 0x00];

/// Capability facets decoded from a characteristic's property bitmask.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct CharacteristicProperties {
    pub readable: bool,
    pub writable: bool,
    pub writable_without_response: bool,
    pub notifiable: bool,
    pub indicatable: bool,
}

impl CharacteristicProperties {
    /// Decodes the GATT characteristic property bitmask.
    ///
    /// ```
    /// let properties = blecentral::CharacteristicProperties::from_bits(0x12);
    /// assert!(properties.readable);
    /// assert!(properties.notifiable);
    /// assert!(!properties.writable);
    /// ```
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self {
            readable: bits & PROPERTY_READ != 0,
            writable: bits & PROPERTY_WRITE != 0,
            writable_without_response: bits & PROPERTY_WRITE_NO_RESPONSE != 0,
            notifiable: bits & PROPERTY_NOTIFY != 0,
            indicatable: bits & PROPERTY_INDICATE != 0,
        }
    }

    /// Re-encodes the decoded facets into a property bitmask.
    #[must_use]
    pub fn bits(self) -> u8 {
        [
            (self.readable, PROPERTY_READ),
            (self.writable, PROPERTY_WRITE),
            (self.writable_without_response, PROPERTY_WRITE_NO_RESPONSE),
            (self.notifiable, PROPERTY_NOTIFY),
            (self.indicatable, PROPERTY_INDICATE),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |bits, (_, flag)| bits | flag)
    }

    /// Picks the write mode, preferring acknowledged writes.
    #[must_use]
    pub fn preferred_write_mode(self) -> Option<WriteMode> {
        if self.writable {
            Some(WriteMode::WithResponse)
        } else if self.writable_without_response {
            Some(WriteMode::WithoutResponse)
        } else {
            None
        }
    }

    /// Picks the CCCD payload for a subscription change.
    ///
    /// Returns `None` when the characteristic supports neither notifications
    /// nor indications, regardless of `enable`.
    #[must_use]
    pub fn subscription_payload(self, enable: bool) -> Option<[u8; 2]> {
        if !self.notifiable && !self.indicatable {
            return None;
        }
        if !enable {
            return Some(DISABLE_NOTIFICATION_VALUE);
        }
        if self.notifiable {
            Some(ENABLE_NOTIFICATION_VALUE)
        } else {
            Some(ENABLE_INDICATION_VALUE)
        }
    }

    /// Returns short labels for each set facet.
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        [
            (self.readable, "read"),
            (self.writable, "write"),
            (self.writable_without_response, "write_without_response"),
            (self.notifiable, "notify"),
            (self.indicatable, "indicate"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}
