use std::collections::HashMap;

use serde::Serialize;

use super::properties::{CCCD_UUID, CharacteristicProperties};
use super::types::canonical_uuid;

/// A characteristic as reported by service discovery.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CharacteristicInfo {
    uuid: String,
    property_bits: u8,
    descriptors: Vec<String>,
}

impl CharacteristicInfo {
    /// Creates a characteristic description.
    #[must_use]
    pub fn new(uuid: impl Into<String>, property_bits: u8, descriptors: Vec<String>) -> Self {
        Self {
            uuid: uuid.into(),
            property_bits,
            descriptors,
        }
    }

    /// Creates a characteristic exposing the client configuration descriptor.
    #[must_use]
    pub fn with_cccd(uuid: impl Into<String>, property_bits: u8) -> Self {
        Self::new(uuid, property_bits, vec![CCCD_UUID.to_string()])
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    #[must_use]
    pub fn property_bits(&self) -> u8 {
        self.property_bits
    }

    #[must_use]
    pub fn properties(&self) -> CharacteristicProperties {
        CharacteristicProperties::from_bits(self.property_bits)
    }

    #[must_use]
    pub fn descriptors(&self) -> &[String] {
        &self.descriptors
    }
}

/// A GATT service with its discovered characteristics.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ServiceInfo {
    uuid: String,
    primary: bool,
    characteristics: Vec<CharacteristicInfo>,
}

impl ServiceInfo {
    /// Creates a service description.
    #[must_use]
    pub fn new(uuid: impl Into<String>, primary: bool, characteristics: Vec<CharacteristicInfo>) -> Self {
        Self {
            uuid: uuid.into(),
            primary,
            characteristics,
        }
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    #[must_use]
    pub fn characteristics(&self) -> &[CharacteristicInfo] {
        &self.characteristics
    }
}

/// Cached characteristic entry for one device.
#[derive(Debug, Clone)]
pub(crate) struct CachedCharacteristic {
    pub(crate) uuid: String,
    pub(crate) service_uuid: String,
    pub(crate) properties: CharacteristicProperties,
    descriptors: Vec<String>,
    pub(crate) cached_value: Option<Vec<u8>>,
}

impl CachedCharacteristic {
    pub(crate) fn has_descriptor(&self, uuid: &str) -> bool {
        let wanted = canonical_uuid(uuid);
        self.descriptors.iter().any(|descriptor| *descriptor == wanted)
    }
}

/// Lower-cased UUID tables for one device's discovered services.
#[derive(Debug, Default)]
pub(crate) struct TopologyCache {
    services: HashMap<String, ServiceInfo>,
    characteristics: HashMap<String, CachedCharacteristic>,
}

impl TopologyCache {
    /// Replaces the cache with a freshly discovered service tree.
    ///
    /// Characteristic UUIDs that repeat across services keep the last one seen.
    pub(crate) fn record(&mut self, services: &[ServiceInfo]) {
        self.clear();
        for service in services {
            let service_uuid = canonical_uuid(service.uuid());
            for characteristic in service.characteristics() {
                let uuid = canonical_uuid(characteristic.uuid());
                self.characteristics.insert(
                    uuid.clone(),
                    CachedCharacteristic {
                        uuid,
                        service_uuid: service_uuid.clone(),
                        properties: characteristic.properties(),
                        descriptors: characteristic
                            .descriptors()
                            .iter()
                            .map(|descriptor| canonical_uuid(descriptor))
                            .collect(),
                        cached_value: None,
                    },
                );
            }
            self.services.insert(service_uuid, service.clone());
        }
    }

    pub(crate) fn clear(&mut self) {
        self.services.clear();
        self.characteristics.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.services.is_empty() && self.characteristics.is_empty()
    }

    pub(crate) fn has_service(&self, uuid: &str) -> bool {
        self.services.contains_key(&canonical_uuid(uuid))
    }

    pub(crate) fn has_characteristic(&self, uuid: &str) -> bool {
        self.characteristics.contains_key(&canonical_uuid(uuid))
    }

    pub(crate) fn characteristic(&self, uuid: &str) -> Option<&CachedCharacteristic> {
        self.characteristics.get(&canonical_uuid(uuid))
    }

    pub(crate) fn characteristic_mut(&mut self, uuid: &str) -> Option<&mut CachedCharacteristic> {
        self.characteristics.get_mut(&canonical_uuid(uuid))
    }

    /// Returns the discovered services sorted by UUID.
    pub(crate) fn services(&self) -> Vec<ServiceInfo> {
        let mut services: Vec<ServiceInfo> = self.services.values().cloned().collect();
        services.sort_by(|left, right| left.uuid().cmp(right.uuid()));
        services
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn sample_services() -> Vec<ServiceInfo> {
        vec![ServiceInfo::new(
            "0000180D-0000-1000-8000-00805F9B34FB",
            true,
            vec![
                CharacteristicInfo::with_cccd("00002A37-0000-1000-8000-00805F9B34FB", 0x10),
                CharacteristicInfo::new("ABCD", 0x02, Vec::new()),
            ],
        )]
    }

    #[rstest]
    #[case("abcd")]
    #[case("ABCD")]
    #[case("AbCd")]
    fn characteristic_lookup_ignores_case(#[case] uuid: &str) {
        let mut cache = TopologyCache::default();
        cache.record(&sample_services());

        assert!(cache.has_characteristic(uuid));
    }

    #[test]
    fn service_lookup_ignores_case() {
        let mut cache = TopologyCache::default();
        cache.record(&sample_services());

        assert!(cache.has_service("0000180d-0000-1000-8000-00805f9b34fb"));
        assert!(!cache.has_service("0000180f-0000-1000-8000-00805f9b34fb"));
    }

    #[test]
    fn record_overwrites_previous_tree() {
        let mut cache = TopologyCache::default();
        cache.record(&sample_services());
        cache.record(&[ServiceInfo::new(
            "1234",
            true,
            vec![CharacteristicInfo::new("5678", 0x08, Vec::new())],
        )]);

        assert!(!cache.has_characteristic("abcd"));
        assert!(cache.has_characteristic("5678"));
    }

    #[test]
    fn duplicate_characteristic_uuid_keeps_last_service() {
        let mut cache = TopologyCache::default();
        cache.record(&[
            ServiceInfo::new("aaaa", true, vec![CharacteristicInfo::new("1234", 0x02, Vec::new())]),
            ServiceInfo::new("bbbb", true, vec![CharacteristicInfo::new("1234", 0x08, Vec::new())]),
        ]);

        let cached = cache.characteristic("1234").expect("characteristic should be cached");
        assert_eq!("bbbb", cached.service_uuid);
        assert!(cached.properties.writable);
    }

    #[test]
    fn descriptor_lookup_uses_canonical_cccd() {
        let mut cache = TopologyCache::default();
        cache.record(&sample_services());

        let notify = cache
            .characteristic("00002a37-0000-1000-8000-00805f9b34fb")
            .expect("characteristic should be cached");
        assert!(notify.has_descriptor(CCCD_UUID));
        let plain = cache.characteristic("abcd").expect("characteristic should be cached");
        assert!(!plain.has_descriptor(CCCD_UUID));
    }

    #[test]
    fn clear_empties_both_tables() {
        let mut cache = TopologyCache::default();
        cache.record(&sample_services());
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.has_service("0000180d-0000-1000-8000-00805f9b34fb"));
    }
}
