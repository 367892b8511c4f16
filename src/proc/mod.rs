//! Internal process data structures and signal queue implementation.
//!
//! # Architecture
//!
//! Process data is split into three sections with different locking requirements:
//!
//! - [`ProcReadOnly`]: Immutable data accessible without locks
//! - [`ProcInternal`]: Mutable state protected by [`Mutex`]
//! - [`ProcExternal`]: Rarely-modified state protected by [`RwLock`]
//!
//! # Signal Queue
//!
//! Every signal addressed to a process, plain messages included, travels
//! through one unbounded MPSC queue ([`ProcSend`]/[`ProcRecv`]). The owning
//! task applies signals in arrival order and moves messages into the
//! mailbox ([`ProcMail`]), which provides selective receive.
//!
//! # Lifetime Management
//!
//! [`ProcTask`] wraps process data and triggers cleanup on drop, ensuring
//! processes are removed from the process table even when their task is
//! cancelled.
//!
//! [`Mutex`]: ::parking_lot::Mutex
//! [`RwLock`]: ::parking_lot::RwLock

mod proc_data;
mod proc_task;
mod proc_trap;
mod sig_queue;

pub(crate) use self::proc_data::ProcData;
pub(crate) use self::proc_data::ProcExternal;
pub(crate) use self::proc_data::ProcInternal;
pub(crate) use self::proc_data::ProcReadOnly;
pub(crate) use self::proc_task::ProcTask;
pub(crate) use self::proc_trap::ProcTrap;
pub(crate) use self::sig_queue::ProcMail;
pub(crate) use self::sig_queue::ProcRecv;
pub(crate) use self::sig_queue::ProcSend;
pub(crate) use self::sig_queue::unbounded_channel;
