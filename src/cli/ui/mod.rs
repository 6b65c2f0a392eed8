mod device_view;
mod inspect_view;
mod listen_view;
mod painter;
mod table;
mod value_view;

pub(crate) use self::device_view::{DeviceView, ScanResultsView};
pub(crate) use self::inspect_view::ServiceTreeView;
pub(crate) use self::listen_view::{ListenReadyView, ListenSummaryView, NotificationView};
pub(crate) use self::painter::Painter;
pub(crate) use self::value_view::{ReadResultView, WriteResultView};
