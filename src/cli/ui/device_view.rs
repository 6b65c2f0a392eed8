use std::fmt::{self, Display, Formatter};

use crate::cli::device::ConnectedDevice;
use crate::gatt::PeripheralRecord;
use crate::utils::format_timestamp;

use super::painter::Painter;
use super::table::Table;

/// Renders a connected peripheral as a key-value table.
pub(crate) struct DeviceView<'a> {
    device: &'a ConnectedDevice,
    painter: &'a Painter,
}

impl<'a> DeviceView<'a> {
    pub(crate) fn new(device: &'a ConnectedDevice, painter: &'a Painter) -> Self {
        Self { device, painter }
    }
}

impl Display for DeviceView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let table = Table::key_value(
            self.painter,
            vec![
                ("device", self.painter.value(self.device.device.as_str())),
                (
                    "name",
                    self.painter
                        .value_or(self.device.name.as_deref(), "<unknown>"),
                ),
            ],
        );
        write!(f, "{table}")
    }
}

/// Renders the peripherals recorded by a scan.
pub(crate) struct ScanResultsView<'a> {
    records: &'a [PeripheralRecord],
    painter: &'a Painter,
}

impl<'a> ScanResultsView<'a> {
    pub(crate) fn new(records: &'a [PeripheralRecord], painter: &'a Painter) -> Self {
        Self { records, painter }
    }
}

impl Display for ScanResultsView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rows = self
            .records
            .iter()
            .map(|record| {
                vec![
                    self.painter.value(record.device().as_str()),
                    self.painter.value_or(record.name(), "<unknown>"),
                    self.painter.muted(format_timestamp(record.last_seen())),
                ]
            })
            .collect();
        let table = Table::grid(["device", "name", "last_seen"], rows);

        if table.is_empty() {
            return write!(f, "{}", self.painter.warning("No peripherals found."));
        }
        write!(
            f,
            "{} {}",
            self.painter.heading("Found peripherals:"),
            self.painter.muted(format!("({})", self.records.len()))
        )?;
        write!(f, "\n{table}")
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use super::*;
    use crate::gatt::DeviceId;

    #[rstest]
    #[case::named(Some("Sensor"), "Sensor")]
    #[case::unnamed(None, "<unknown>")]
    fn device_view_renders_name_or_placeholder(
        #[case] name: Option<&str>,
        #[case] expected: &str,
    ) {
        let device = ConnectedDevice {
            device: DeviceId::from("AA:BB"),
            name: name.map(String::from),
        };
        let painter = Painter::new(false);

        let rendered = DeviceView::new(&device, &painter).to_string();

        assert!(rendered.contains("AA:BB"));
        assert!(rendered.contains(expected));
    }

    #[test]
    fn empty_scan_renders_warning() {
        let painter = Painter::new(false);
        assert_snapshot!(
            ScanResultsView::new(&[], &painter).to_string(),
            @"No peripherals found."
        );
    }
}
