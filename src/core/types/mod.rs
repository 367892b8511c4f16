//! Fundamental runtime types: identifiers, payloads and exit reasons.
//!
//! # Identification
//!
//! - [`NodeName`]: Interned transport address of a node
//! - [`NodeId`]: One incarnation of a node
//! - [`LocalPid`]: Process table slot and serial
//! - [`ProcessId`]: Location-transparent process identifier
//! - [`MonitorRef`]: Monitor identifier
//! - [`ChannelId`]: Typed channel identifier
//!
//! # Values
//!
//! - [`Tag`]: Stable type tag consulted by selective receive
//! - [`Item`]: Trait implemented by every payload type
//! - [`Term`]: Type-erased payload, local or encoded
//! - [`Exit`]: Process exit reason

mod exit;
mod item;
mod node_id;
mod node_name;
mod pid;
mod refs;
mod tag;
mod term;

pub use self::exit::Exit;
pub use self::item::Item;
pub use self::node_id::NodeId;
pub use self::node_name::NodeName;
pub use self::pid::LocalPid;
pub use self::pid::ProcessId;
pub use self::refs::ChannelId;
pub use self::refs::MonitorRef;
pub use self::tag::Tag;
pub use self::term::Term;
