use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Transport-assigned peripheral address in string form.
#[derive(
    Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, derive_more::Display,
    derive_more::From, derive_more::Into,
)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies one connection attempt to one device.
///
/// The generation increases on every new attempt so that callbacks issued for
/// an earlier attempt can be recognised and dropped.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ConnectionHandle {
    device: DeviceId,
    generation: u64,
}

impl ConnectionHandle {
    pub(crate) fn new(device: DeviceId, generation: u64) -> Self {
        Self { device, generation }
    }

    /// Returns the device this handle belongs to.
    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Returns the connection attempt number.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

const GATT_SUCCESS: u16 = 0x0000;
const GATT_READ_NOT_PERMITTED: u16 = 0x0002;
const GATT_WRITE_NOT_PERMITTED: u16 = 0x0003;
const GATT_INVALID_ATTRIBUTE_LENGTH: u16 = 0x000D;

/// Generic transport error code used when the backend reports no finer detail.
pub const GATT_ERROR: u16 = 0x0085;

/// Completion status attached to transport callbacks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum GattStatus {
    Success,
    ReadNotPermitted,
    WriteNotPermitted,
    InvalidAttributeLength,
    Failure(u16),
}

impl GattStatus {
    /// Classifies a raw ATT/GATT status code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            GATT_SUCCESS => Self::Success,
            GATT_READ_NOT_PERMITTED => Self::ReadNotPermitted,
            GATT_WRITE_NOT_PERMITTED => Self::WriteNotPermitted,
            GATT_INVALID_ATTRIBUTE_LENGTH => Self::InvalidAttributeLength,
            other => Self::Failure(other),
        }
    }

    /// Returns the raw status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Success => GATT_SUCCESS,
            Self::ReadNotPermitted => GATT_READ_NOT_PERMITTED,
            Self::WriteNotPermitted => GATT_WRITE_NOT_PERMITTED,
            Self::InvalidAttributeLength => GATT_INVALID_ATTRIBUTE_LENGTH,
            Self::Failure(code) => code,
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Display for GattStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Canonical form used for every UUID key: trimmed and lower-cased.
pub(crate) fn canonical_uuid(uuid: &str) -> String {
    uuid.trim().to_ascii_lowercase()
}
