use std::fmt::{self, Display, Formatter};

use crate::gatt::{CCCD_UUID, ServiceInfo};

use super::painter::Painter;
use super::table::Table;

/// Renders discovered services as one row per characteristic.
///
/// Each row shows the capability facets the connection manager gates
/// operations on, plus whether a client configuration descriptor exists.
pub(crate) struct ServiceTreeView<'a> {
    services: &'a [ServiceInfo],
    painter: &'a Painter,
}

impl<'a> ServiceTreeView<'a> {
    pub(crate) fn new(services: &'a [ServiceInfo], painter: &'a Painter) -> Self {
        Self { services, painter }
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for service in self.services {
            let service_label = if service.is_primary() {
                self.painter.value(service.uuid())
            } else {
                format!(
                    "{} {}",
                    self.painter.value(service.uuid()),
                    self.painter.muted("(secondary)")
                )
            };

            if service.characteristics().is_empty() {
                rows.push(vec![
                    service_label,
                    self.painter.muted("<none>"),
                    String::new(),
                    String::new(),
                ]);
                continue;
            }

            for (index, characteristic) in service.characteristics().iter().enumerate() {
                let properties = characteristic.properties().labels();
                let has_cccd = characteristic
                    .descriptors()
                    .iter()
                    .any(|descriptor| descriptor.eq_ignore_ascii_case(CCCD_UUID));
                rows.push(vec![
                    if index == 0 {
                        service_label.clone()
                    } else {
                        String::new()
                    },
                    self.painter.value(characteristic.uuid()),
                    if properties.is_empty() {
                        self.painter.muted("-")
                    } else {
                        properties.join(", ")
                    },
                    self.painter.flag(has_cccd),
                ]);
            }
        }
        rows
    }
}

impl Display for ServiceTreeView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let table = Table::grid(
            ["service", "characteristic", "properties", "cccd"],
            self.rows(),
        );
        if table.is_empty() {
            return write!(f, "{}", self.painter.warning("No services discovered."));
        }
        write!(f, "{table}")
    }
}
