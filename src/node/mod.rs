//! Nodes: process hosts bridged by a transport.
//!
//! A [`Node`] owns the local process table, the name registry, the channel
//! table and a transport endpoint. Process identifiers name the node
//! incarnation that created them, so any node can route a signal to any
//! process it has heard of.
//!
//! # Failure Detection
//!
//! A node watches its outgoing connections. When one is lost, every link
//! and monitor from a local process towards the remote node fires with
//! [`Exit::Disconnected`], and node monitors receive a
//! [`NodeDownMessage`].
//!
//! [`Exit::Disconnected`]: crate::core::Exit::Disconnected
//! [`NodeDownMessage`]: crate::erts::NodeDownMessage

mod config;
mod error;
mod node_data;
mod node_handle;
mod peer;
mod remote_table;
mod watch;

pub(crate) use self::node_data::NodeInner;
pub(crate) use self::node_data::NodeRef;
pub(crate) use self::node_data::NodeWeak;

pub use self::config::NodeConfig;
pub use self::error::NodeError;
pub use self::node_handle::MailboxRef;
pub use self::node_handle::Node;
pub use self::node_handle::Resolved;
pub use self::remote_table::RemoteTable;
