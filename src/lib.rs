//! BLE central-role connection manager.
//!
//! [`ConnectionManager`] is a synchronous core that drives any [`Transport`]
//! and reports every result as a [`BleEvent`]. [`BleService`] runs it on a
//! tokio task over the `btleplug` or fake backend, and the `blecentral`
//! binary exposes scan, inspect, read, write and listen commands on top.

mod app;
mod cli;
mod error;
mod gatt;
mod hw;
mod service;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    fake_transport_provider, real_transport_provider, run, run_with_clients,
    run_with_clients_and_log_level, run_with_log_level,
};
pub use cli::{
    Args, Command, DeviceArgs, FakeArgs, InspectArgs, ListenArgs, LogLevel, OutputFormat,
    ReadArgs, ScanArgs, WriteArgs,
};
pub use error::{FixtureError, GattError, InteractionError, OperationError, TransportError};
pub use gatt::{
    BleEvent, CCCD_UUID, CharacteristicInfo, CharacteristicProperties, CharacteristicValue,
    ConnectionHandle, ConnectionManager, ConnectionState, DISABLE_NOTIFICATION_VALUE, DeviceId,
    ENABLE_INDICATION_VALUE, ENABLE_NOTIFICATION_VALUE, EventSink, GATT_ERROR, GattStatus,
    OperationOutcome, PeripheralRecord, ScanFilters, ServiceInfo, Transport, TransportEvent,
    ValueEncoding, WriteMode,
};
pub use hw::TransportProvider;
pub use service::{BleClient, BleService};
pub use terminal::TerminalClient;
