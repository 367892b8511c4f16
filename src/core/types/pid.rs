use serde::Deserialize;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::NodeId;

// -----------------------------------------------------------------------------
// Local PID
// -----------------------------------------------------------------------------

/// Node-local part of a process identifier.
///
/// The `index` addresses a slot in the node's process table; the `serial`
/// is the incarnation of that slot. A slot's serial grows every time it is
/// vacated, so an index/serial pair is issued at most once.
///
/// # Bit Layout
///
/// ```text
/// +--------------------------------+--------------------------------+
/// |             index              |             serial             |
/// +--------------------------------+--------------------------------+
///  63                            32 31                             0
/// ```
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalPid {
  index: u32,
  serial: u32,
}

impl LocalPid {
  /// Creates a new local PID from a table index and serial.
  #[inline]
  pub const fn new(index: u32, serial: u32) -> Self {
    Self { index, serial }
  }

  /// Creates a local PID from its packed representation.
  #[inline]
  pub const fn from_bits(bits: u64) -> Self {
    Self::new((bits >> 32) as u32, bits as u32)
  }

  /// Returns the packed representation.
  #[inline]
  pub const fn into_bits(self) -> u64 {
    ((self.index as u64) << 32) | self.serial as u64
  }

  /// Returns the process table index.
  #[inline]
  pub const fn index(&self) -> u32 {
    self.index
  }

  /// Returns the incarnation of the process table slot.
  #[inline]
  pub const fn serial(&self) -> u32 {
    self.serial
  }
}

impl Debug for LocalPid {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for LocalPid {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "<{}.{}>", self.index, self.serial)
  }
}

// -----------------------------------------------------------------------------
// Process ID
// -----------------------------------------------------------------------------

/// Location-transparent process identifier.
///
/// A `ProcessId` names its node incarnation and its slot incarnation, so it
/// stays meaningful after crossing the transport and never refers to a
/// second process.
///
/// # Display Format
///
/// `#PID<node.index.serial>`
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId {
  node: NodeId,
  local: LocalPid,
}

impl ProcessId {
  /// Creates a process identifier from its parts.
  #[inline]
  pub const fn new(node: NodeId, local: LocalPid) -> Self {
    Self { node, local }
  }

  /// Returns the node that created this process.
  #[inline]
  pub const fn node(&self) -> NodeId {
    self.node
  }

  /// Returns the node-local part of the identifier.
  #[inline]
  pub const fn local(&self) -> LocalPid {
    self.local
  }
}

impl Debug for ProcessId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for ProcessId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(
      f,
      "#PID<{}.{}.{}>",
      self.node.name(),
      self.local.index,
      self.local.serial,
    )
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::LocalPid;
  use crate::core::NodeId;
  use crate::core::NodeName;
  use crate::core::ProcessId;

  fn node(creation: u32) -> NodeId {
    NodeId::new(NodeName::new("pid-test"), creation)
  }

  #[test]
  fn test_bits_layout() {
    let pid: LocalPid = LocalPid::new(7, 3);

    assert_eq!(pid.into_bits(), (7 << 32) | 3);
    assert_eq!(LocalPid::from_bits(pid.into_bits()), pid);
  }

  #[test]
  fn test_display() {
    let pid: ProcessId = ProcessId::new(node(1), LocalPid::new(12, 0));
    assert_eq!(format!("{pid}"), "#PID<pid-test.12.0>");
  }

  #[test]
  fn test_serial_distinguishes() {
    let old: ProcessId = ProcessId::new(node(1), LocalPid::new(4, 0));
    let new: ProcessId = ProcessId::new(node(1), LocalPid::new(4, 1));

    assert_ne!(old, new);
  }

  #[test]
  fn test_creation_distinguishes() {
    let old: ProcessId = ProcessId::new(node(1), LocalPid::new(4, 0));
    let new: ProcessId = ProcessId::new(node(2), LocalPid::new(4, 0));

    assert_ne!(old, new);
  }

  #[test]
  fn test_serde() {
    let pid: ProcessId = ProcessId::new(node(9), LocalPid::new(1, 2));
    let data: Vec<u8> = postcard::to_allocvec(&pid).unwrap();

    assert_eq!(postcard::from_bytes::<ProcessId>(&data).unwrap(), pid);
  }
}
