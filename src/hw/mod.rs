mod btleplug_backend;
mod fake_backend;
mod hardware;

#[cfg(test)]
pub(crate) use self::fake_backend::{BODY_SENSOR_LOCATION, CUSTOM_DATA, HEART_RATE_MEASUREMENT};
pub(crate) use self::fake_backend::{
    FakeBackendConfig, HexPayload, NotificationPayloads, ScanFixture,
};
pub use self::hardware::TransportProvider;
pub(crate) use self::hardware::{HardwareBackend, transport_provider_from_backend};
