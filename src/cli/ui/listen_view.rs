use std::fmt::{self, Display, Formatter};

use crate::cli::device::ConnectedDevice;
use crate::cli::listen::{ListenStopReason, ListenSummary, Notification};
use crate::utils::format_hex;

use super::device_view::DeviceView;
use super::painter::Painter;
use super::table::Table;

/// Renders the listen-session readiness output.
pub(crate) struct ListenReadyView<'a> {
    device: &'a ConnectedDevice,
    uuid: &'a str,
    painter: &'a Painter,
}

impl<'a> ListenReadyView<'a> {
    pub(crate) fn new(device: &'a ConnectedDevice, uuid: &'a str, painter: &'a Painter) -> Self {
        Self {
            device,
            uuid,
            painter,
        }
    }
}

impl Display for ListenReadyView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let session_table = Table::key_value(
            self.painter,
            vec![("listening_on", self.painter.value(self.uuid))],
        );
        let device = DeviceView::new(self.device, self.painter);

        write!(f, "{}", self.painter.heading("Connected device:"))?;
        write!(f, "\n{device}")?;
        writeln!(f)?;
        write!(f, "\n{}", self.painter.heading("Listen session:"))?;
        write!(f, "\n{session_table}")
    }
}

/// Renders a single notification line.
pub(crate) struct NotificationView<'a> {
    notification: &'a Notification,
    painter: &'a Painter,
}

impl<'a> NotificationView<'a> {
    pub(crate) fn new(notification: &'a Notification, painter: &'a Painter) -> Self {
        Self {
            notification,
            painter,
        }
    }
}

impl Display for NotificationView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let index_label = self
            .painter
            .muted(format!("[{:04}]", self.notification.index));
        write!(
            f,
            "{index_label} {}",
            self.painter.value(format_hex(&self.notification.value))
        )
    }
}

/// Renders the listen session summary.
pub(crate) struct ListenSummaryView<'a> {
    summary: &'a ListenSummary,
    painter: &'a Painter,
}

impl<'a> ListenSummaryView<'a> {
    pub(crate) fn new(summary: &'a ListenSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ListenSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let stop_reason = match self.summary.stop_reason {
            ListenStopReason::ReachedLimit => self.painter.success("reached limit"),
            ListenStopReason::Interrupted => self.painter.warning("interrupted"),
            ListenStopReason::Disconnected => self.painter.warning("device disconnected"),
        };
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Stopped:"),
            stop_reason,
            self.painter.value(format!(
                "- received {} notification(s)",
                self.summary.received
            ))
        )
    }
}
