use serde::Deserialize;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::NodeId;

// -----------------------------------------------------------------------------
// Monitor Ref
// -----------------------------------------------------------------------------

/// Reference identifying one monitor.
///
/// Down notifications carry the reference of the monitor that produced
/// them. References are unique per node incarnation.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorRef {
  node: NodeId,
  id: u64,
}

impl MonitorRef {
  #[inline]
  pub(crate) const fn new(node: NodeId, id: u64) -> Self {
    Self { node, id }
  }

  /// Returns the node that created the reference.
  #[inline]
  pub const fn node(&self) -> NodeId {
    self.node
  }
}

impl Debug for MonitorRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for MonitorRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "#Ref<{}.{}>", self.node.name(), self.id)
  }
}

// -----------------------------------------------------------------------------
// Channel ID
// -----------------------------------------------------------------------------

/// Identifier of a typed channel, owned by the node hosting its receive
/// port.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
  node: NodeId,
  index: u64,
}

impl ChannelId {
  #[inline]
  pub(crate) const fn new(node: NodeId, index: u64) -> Self {
    Self { node, index }
  }

  /// Returns the node hosting the receive port.
  #[inline]
  pub const fn node(&self) -> NodeId {
    self.node
  }

  /// Returns the node-local channel index.
  #[inline]
  pub const fn index(&self) -> u64 {
    self.index
  }
}

impl Debug for ChannelId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for ChannelId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "#Chan<{}.{}>", self.node.name(), self.index)
  }
}
