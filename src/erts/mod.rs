//! Core "erts" types of the tarazed runtime system.
//!
//! - [`Process`]: The API available inside a process body
//! - [`Match`]: Selective receive arms
//! - [`SendPort`]/[`ReceivePort`]: Typed channels
//! - [`Envelope`] and the system messages delivered to mailboxes

mod channel;
mod message;
mod process;
mod process_info;
mod receive;
mod runtime;
mod signal;
mod spawn;

pub(crate) use self::channel::ChanSink;
pub(crate) use self::channel::ChanTable;
pub(crate) use self::channel::new_channel;
pub(crate) use self::signal::Signal;
pub(crate) use self::signal::SignalDemonitor;
pub(crate) use self::signal::SignalEmit;
pub(crate) use self::signal::SignalExit;
pub(crate) use self::signal::SignalKill;
pub(crate) use self::signal::SignalLink;
pub(crate) use self::signal::SignalLinkExit;
pub(crate) use self::signal::SignalMonitor;
pub(crate) use self::signal::SignalMonitorDown;
pub(crate) use self::signal::SignalNodeDown;
pub(crate) use self::signal::SignalRecv;
pub(crate) use self::signal::SignalSend;
pub(crate) use self::signal::SignalUnlink;
pub(crate) use self::spawn::SpawnReply;

pub use self::channel::ReceivePort;
pub use self::channel::SendPort;
pub use self::channel::merge_ports;
pub use self::message::DownMessage;
pub use self::message::Envelope;
pub use self::message::ExitMessage;
pub use self::message::NodeDownMessage;
pub use self::process::Process;
pub use self::process_info::ProcessFlags;
pub use self::process_info::ProcessInfo;
pub use self::process_info::ProcessState;
pub use self::receive::Match;
pub use self::runtime::LogConfig;
pub use self::runtime::Runtime;
pub use self::runtime::RuntimeConfig;
pub use self::spawn::SpawnConfig;
pub use self::spawn::SpawnError;
pub use self::spawn::SpawnHandle;
