//! Tarazed - lightweight processes with location-transparent messaging.
//!
//! Tarazed runs Erlang-style processes as tokio tasks. A [`ProcessId`] stays
//! valid across nodes, so the same send, link and monitor operations work
//! locally and over any [`Transport`]. Messages are typed and received
//! selectively.
//!
//! # Quick Start
//!
//! ```no_run
//! use tarazed::dist::MemoryTransport;
//! use tarazed::erts::Process;
//! use tarazed::init;
//! use tarazed::node::Node;
//! use tarazed::node::RemoteTable;
//!
//! let result = init::run_node(MemoryTransport::new(), "main", RemoteTable::new(), |node: Node| async move {
//!   let (reply, mut replies) = node.new_channel::<String>();
//!
//!   let pid = node.spawn(async move {
//!     let text: String = Process::receive().await;
//!     reply.send(text.to_uppercase());
//!   });
//!
//!   node.send(pid, String::from("hello"));
//!   replies.recv().await
//! });
//!
//! assert_eq!(result.unwrap(), "HELLO");
//! ```
//!
//! # Core Modules
//!
//! - [`init`]: Runtime bootstrap
//! - [`node`]: Nodes, remote tables and connections
//! - [`erts`]: Process API, selective receive and channels
//! - [`dist`]: Transport boundary and the reference transports
//! - [`core`]: Core types (PIDs, references, terms, exit reasons)
//! - [`error`]: Exception system
//! - [`consts`]: Runtime configuration constants
//!
//! [`ProcessId`]: crate::core::ProcessId
//! [`Transport`]: crate::dist::Transport

mod bifs;
mod loom;
mod proc;

pub mod consts;
pub mod core;
pub mod dist;
pub mod error;
pub mod erts;
pub mod init;
pub mod node;
