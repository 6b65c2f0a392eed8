use std::fmt::{self, Display, Formatter};

use crate::cli::read::ReadReport;
use crate::cli::write::WriteReport;
use crate::gatt::OperationOutcome;
use crate::utils::format_hex;

use super::painter::Painter;
use super::table::Table;

/// Renders the value returned by a characteristic read.
pub(crate) struct ReadResultView<'a> {
    report: &'a ReadReport,
    painter: &'a Painter,
}

impl<'a> ReadResultView<'a> {
    pub(crate) fn new(report: &'a ReadReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for ReadResultView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut rows = vec![
            ("device", self.painter.value(self.report.device.device.as_str())),
            ("uuid", self.painter.value(&self.report.uuid)),
            ("value", self.painter.value(format_hex(&self.report.value))),
        ];
        if let Some(decoded) = &self.report.decoded {
            rows.push(("decoded", self.painter.value(decoded)));
        }

        write!(f, "{}", self.painter.heading("Characteristic read:"))?;
        write!(f, "\n{}", Table::key_value(self.painter, rows))
    }
}

/// Renders a completed characteristic write.
pub(crate) struct WriteResultView<'a> {
    report: &'a WriteReport,
    painter: &'a Painter,
}

impl<'a> WriteResultView<'a> {
    pub(crate) fn new(report: &'a WriteReport, painter: &'a Painter) -> Self {
        Self { report, painter }
    }
}

impl Display for WriteResultView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let outcome = match self.report.outcome {
            OperationOutcome::Dispatched => self.painter.success("dispatched"),
            OperationOutcome::Queued { position } => {
                self.painter.warning(format!("queued at position {position}"))
            }
        };
        let table = Table::key_value(
            self.painter,
            vec![
                ("device", self.painter.value(self.report.device.device.as_str())),
                ("uuid", self.painter.value(&self.report.uuid)),
                ("value", self.painter.value(&self.report.value)),
                ("payload", self.painter.value(format_hex(&self.report.payload))),
                ("submitted", outcome),
            ],
        );

        write!(f, "{}", self.painter.heading("Characteristic written:"))?;
        write!(f, "\n{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::device::ConnectedDevice;
    use crate::gatt::DeviceId;

    fn device() -> ConnectedDevice {
        ConnectedDevice {
            device: DeviceId::from("AA:BB"),
            name: Some("Sensor".to_string()),
        }
    }

    #[test]
    fn read_view_includes_decoded_value_when_requested() {
        let report = ReadReport {
            device: device(),
            uuid: "2a38".to_string(),
            value: vec![0x2A, 0x00, 0x00, 0x00],
            decoded: Some("42".to_string()),
        };
        let painter = Painter::new(false);

        let rendered = ReadResultView::new(&report, &painter).to_string();

        assert!(rendered.contains("2A 00 00 00"));
        assert!(rendered.contains("decoded"));
    }

    #[test]
    fn write_view_reports_queue_position() {
        let report = WriteReport {
            device: device(),
            uuid: "fff1".to_string(),
            value: "7".to_string(),
            payload: vec![0x07, 0x00, 0x00, 0x00],
            outcome: OperationOutcome::Queued { position: 2 },
        };
        let painter = Painter::new(false);

        let rendered = WriteResultView::new(&report, &painter).to_string();

        assert!(rendered.contains("queued at position 2"));
        assert!(rendered.contains("07 00 00 00"));
    }
}
