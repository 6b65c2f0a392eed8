pub(crate) mod command;
pub(crate) mod device;
pub(crate) mod inspect;
pub(crate) mod listen;
pub(crate) mod read;
pub(crate) mod scan;
pub(crate) mod ui;
pub(crate) mod write;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::device::DeviceArgs;
pub use self::inspect::InspectArgs;
pub use self::listen::ListenArgs;
pub use self::read::ReadArgs;
pub use self::scan::ScanArgs;
pub use self::write::WriteArgs;

/// Compares two UUIDs the way the connection manager keys them.
pub(crate) fn same_uuid(left: &str, right: &str) -> bool {
    crate::gatt::canonical_uuid(left) == crate::gatt::canonical_uuid(right)
}
