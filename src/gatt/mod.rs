//! Transport-independent central-role core.

mod connection;
mod event;
mod manager;
mod properties;
mod queue;
mod scan;
#[cfg(test)]
pub(crate) mod testing;
mod topology;
mod transport;
mod types;
mod value;

pub use connection::ConnectionState;
pub use event::{BleEvent, EventSink};
pub use manager::ConnectionManager;
pub use properties::{
    CCCD_UUID, CharacteristicProperties, DISABLE_NOTIFICATION_VALUE, ENABLE_INDICATION_VALUE,
    ENABLE_NOTIFICATION_VALUE,
};
pub use queue::OperationOutcome;
pub use scan::{PeripheralRecord, ScanFilters};
pub use topology::{CharacteristicInfo, ServiceInfo};
pub use transport::{Transport, TransportEvent};
pub use types::{ConnectionHandle, DeviceId, GATT_ERROR, GattStatus};
pub use value::{CharacteristicValue, ValueEncoding, WriteMode};

pub(crate) use types::canonical_uuid;
