use std::collections::HashSet;

use bon::Builder;
use serde::Serialize;
use time::OffsetDateTime;

use super::types::{DeviceId, canonical_uuid};

/// Immutable scan restrictions; every field that is set must match.
#[derive(Debug, Clone, Default, Eq, PartialEq, Builder)]
pub struct ScanFilters {
    #[builder(into)]
    name: Option<String>,
    #[builder(into)]
    address: Option<String>,
    #[builder(into)]
    service_uuid: Option<String>,
}

impl ScanFilters {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    #[must_use]
    pub fn service_uuid(&self) -> Option<&str> {
        self.service_uuid.as_deref()
    }

    /// Checks one advertisement against the filters.
    ///
    /// ```
    /// use blecentral::ScanFilters;
    ///
    /// let filters = ScanFilters::builder().name("Sensor").build();
    /// assert!(filters.matches("AA:BB", Some("Sensor"), &[]));
    /// assert!(!filters.matches("AA:BB", None, &[]));
    /// ```
    #[must_use]
    pub fn matches(&self, address: &str, name: Option<&str>, services: &[String]) -> bool {
        let name_matches = self
            .name
            .as_deref()
            .is_none_or(|wanted| wanted.is_empty() || name == Some(wanted));
        let address_matches = self
            .address
            .as_deref()
            .is_none_or(|wanted| wanted.is_empty() || wanted.eq_ignore_ascii_case(address));
        let service_matches = self.service_uuid.as_deref().is_none_or(|wanted| {
            let wanted = canonical_uuid(wanted);
            wanted.is_empty() || services.iter().any(|uuid| canonical_uuid(uuid) == wanted)
        });

        name_matches && address_matches && service_matches
    }
}

/// A peripheral observed during the current scan session.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PeripheralRecord {
    device: DeviceId,
    name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    last_seen: OffsetDateTime,
}

impl PeripheralRecord {
    #[must_use]
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn last_seen(&self) -> OffsetDateTime {
        self.last_seen
    }
}

/// De-duplicates discovery callbacks within one scan.
#[derive(Debug, Default)]
pub(crate) struct ScanSession {
    active: bool,
    filters: ScanFilters,
    records: Vec<PeripheralRecord>,
    reported: HashSet<DeviceId>,
}

impl ScanSession {
    /// Begins a new session, discarding the previous session's records.
    pub(crate) fn start(&mut self, filters: ScanFilters) {
        self.active = true;
        self.filters = filters;
        self.records.clear();
        self.reported.clear();
    }

    /// Ends the session. Returns whether a scan was running.
    ///
    /// Records are kept until the next [`ScanSession::start`] so that
    /// `connect_by_name` can still resolve devices seen by this scan.
    pub(crate) fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    /// Records an advertisement and returns the record when it is the first
    /// report of this identity in the session.
    pub(crate) fn on_discovery(
        &mut self,
        device: DeviceId,
        name: Option<String>,
        services: &[String],
    ) -> Option<&PeripheralRecord> {
        if !self.active || !self.filters.matches(device.as_str(), name.as_deref(), services) {
            return None;
        }

        let now = OffsetDateTime::now_utc();
        if self.reported.contains(&device) {
            if let Some(record) = self.records.iter_mut().find(|record| record.device == device) {
                record.last_seen = now;
                if record.name.is_none() {
                    record.name = name;
                }
            }
            return None;
        }

        self.reported.insert(device.clone());
        self.records.push(PeripheralRecord {
            device,
            name,
            last_seen: now,
        });
        self.records.last()
    }

    pub(crate) fn records(&self) -> &[PeripheralRecord] {
        &self.records
    }

    pub(crate) fn find_by_name(&self, name: &str) -> Option<&PeripheralRecord> {
        self.records
            .iter()
            .find(|record| record.name.as_deref() == Some(name))
    }

    pub(crate) fn find(&self, device: &DeviceId) -> Option<&PeripheralRecord> {
        self.records.iter().find(|record| record.device == *device)
    }
}
