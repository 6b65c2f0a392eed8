use std::sync::{Arc, Mutex, MutexGuard};

use super::event::{BleEvent, EventSink};
use super::scan::ScanFilters;
use super::transport::Transport;
use super::types::ConnectionHandle;
use super::value::WriteMode;
use crate::error::TransportError;

/// A transport command as observed by [`RecordingTransport`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Command {
    StartScan,
    StopScan,
    Connect(ConnectionHandle),
    Disconnect(ConnectionHandle),
    DiscoverServices(ConnectionHandle),
    Read {
        uuid: String,
    },
    Write {
        uuid: String,
        payload: Vec<u8>,
        mode: WriteMode,
    },
    NotificationDelivery {
        uuid: String,
        enable: bool,
    },
    DescriptorWrite {
        characteristic_uuid: String,
        descriptor_uuid: String,
        value: Vec<u8>,
    },
    RequestMtu(u16),
}

#[derive(Debug, Default)]
struct Shared {
    commands: Vec<Command>,
    refuse: Option<TransportError>,
}

/// Transport that records every command and accepts all of them unless told
/// to refuse.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTransport {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingTransport {
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.lock().commands.clone()
    }

    pub(crate) fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.lock().commands)
    }

    /// Makes every later command fail synchronously with `error`.
    pub(crate) fn refuse_with(&self, error: TransportError) {
        self.lock().refuse = Some(error);
    }

    pub(crate) fn accept_all(&self) {
        self.lock().refuse = None;
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("recording transport mutex poisoned")
    }

    fn record(&self, command: Command) -> Result<(), TransportError> {
        let mut shared = self.lock();
        if let Some(error) = shared.refuse.clone() {
            return Err(error);
        }
        shared.commands.push(command);
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn start_scan(&mut self, _filters: &ScanFilters) -> Result<(), TransportError> {
        self.record(Command::StartScan)
    }

    fn stop_scan(&mut self) {
        self.lock().commands.push(Command::StopScan);
    }

    fn connect(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        self.record(Command::Connect(handle.clone()))
    }

    fn disconnect(&mut self, handle: &ConnectionHandle) {
        self.lock().commands.push(Command::Disconnect(handle.clone()));
    }

    fn discover_services(&mut self, handle: &ConnectionHandle) -> Result<(), TransportError> {
        self.record(Command::DiscoverServices(handle.clone()))
    }

    fn read_characteristic(
        &mut self,
        _handle: &ConnectionHandle,
        uuid: &str,
    ) -> Result<(), TransportError> {
        self.record(Command::Read {
            uuid: uuid.to_string(),
        })
    }

    fn write_characteristic(
        &mut self,
        _handle: &ConnectionHandle,
        uuid: &str,
        payload: &[u8],
        mode: WriteMode,
    ) -> Result<(), TransportError> {
        self.record(Command::Write {
            uuid: uuid.to_string(),
            payload: payload.to_vec(),
            mode,
        })
    }

    fn set_notification_delivery(
        &mut self,
        _handle: &ConnectionHandle,
        uuid: &str,
        enable: bool,
    ) -> Result<(), TransportError> {
        self.record(Command::NotificationDelivery {
            uuid: uuid.to_string(),
            enable,
        })
    }

    fn write_descriptor(
        &mut self,
        _handle: &ConnectionHandle,
        characteristic_uuid: &str,
        descriptor_uuid: &str,
        value: &[u8],
    ) -> Result<(), TransportError> {
        self.record(Command::DescriptorWrite {
            characteristic_uuid: characteristic_uuid.to_string(),
            descriptor_uuid: descriptor_uuid.to_string(),
            value: value.to_vec(),
        })
    }

    fn request_mtu(&mut self, _handle: &ConnectionHandle, mtu: u16) -> Result<(), TransportError> {
        self.record(Command::RequestMtu(mtu))
    }
}

/// Event sink that keeps every emitted event.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<BleEvent>>>,
}

impl RecordingSink {
    pub(crate) fn take(&self) -> Vec<BleEvent> {
        std::mem::take(&mut *self.events.lock().expect("recording sink mutex poisoned"))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BleEvent) {
        self.events
            .lock()
            .expect("recording sink mutex poisoned")
            .push(event);
    }
}
