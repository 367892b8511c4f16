//! Builtin functions backing the [`Process`] and [`Node`] APIs.
//!
//! Functions taking a [`ProcTask`] act on behalf of the calling process.
//! Functions taking a [`NodeInner`] can be used from outside any process.
//!
//! [`Process`]: crate::erts::Process
//! [`Node`]: crate::node::Node
//! [`ProcTask`]: crate::proc::ProcTask
//! [`NodeInner`]: crate::node::NodeInner

mod info;
mod link;
mod mailbox;
mod monitor;
mod name;
mod spawn;
mod trap;

pub(crate) use self::info::proc_alive;
pub(crate) use self::info::proc_get_flags;
pub(crate) use self::info::proc_info;
pub(crate) use self::info::proc_list;
pub(crate) use self::info::proc_set_flag;
pub(crate) use self::info::proc_set_flags;
pub(crate) use self::link::proc_link;
pub(crate) use self::link::proc_unlink;
pub(crate) use self::mailbox::proc_receive;
pub(crate) use self::mailbox::proc_send;
pub(crate) use self::mailbox::proc_send_named;
pub(crate) use self::mailbox::proc_send_named_on;
pub(crate) use self::monitor::proc_demonitor;
pub(crate) use self::monitor::proc_demonitor_node;
pub(crate) use self::monitor::proc_monitor;
pub(crate) use self::monitor::proc_monitor_node;
pub(crate) use self::name::proc_register;
pub(crate) use self::name::proc_registered;
pub(crate) use self::name::proc_release;
pub(crate) use self::name::proc_unregister;
pub(crate) use self::name::proc_whereis;
pub(crate) use self::spawn::proc_exit;
pub(crate) use self::spawn::proc_kill;
pub(crate) use self::spawn::proc_remove;
pub(crate) use self::spawn::proc_spawn;
pub(crate) use self::trap::TrapGuard;
pub(crate) use self::trap::trap_accepts;
pub(crate) use self::trap::trap_install;
pub(crate) use self::trap::trap_reason;
