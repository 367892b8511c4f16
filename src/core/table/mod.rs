//! Global tables for node names and process entries.

mod name_table;
mod proc_table;

pub(crate) use self::name_table::NameTable;

pub use self::name_table::NameTableError;
pub use self::proc_table::ProcTable;
pub use self::proc_table::ProcTableError;
