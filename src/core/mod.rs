//! Core runtime types and tables.

mod error;
mod table;
mod types;

pub use self::error::DecodeError;

pub(crate) use self::table::NameTable;

pub use self::table::NameTableError;
pub use self::table::ProcTable;
pub use self::table::ProcTableError;

pub use self::types::ChannelId;
pub use self::types::Exit;
pub use self::types::Item;
pub use self::types::LocalPid;
pub use self::types::MonitorRef;
pub use self::types::NodeId;
pub use self::types::NodeName;
pub use self::types::ProcessId;
pub use self::types::Tag;
pub use self::types::Term;
