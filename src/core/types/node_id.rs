use serde::Deserialize;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::hash::BuildHasher;
use std::hash::RandomState;
use std::process;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use crate::core::NodeName;
use crate::erts::Runtime;

/// Identity of one incarnation of a node.
///
/// The `creation` counter distinguishes a node from an earlier node that
/// was bound to the same address, so identifiers issued by the earlier
/// incarnation never resolve to processes of the later one.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
  name: NodeName,
  creation: u32,
}

impl NodeId {
  /// Creates a node identifier from its parts.
  #[inline]
  pub const fn new(name: NodeName, creation: u32) -> Self {
    Self { name, creation }
  }

  /// Creates an identifier for a new incarnation of `name`.
  ///
  /// Creations issued within one OS process never repeat. Across processes
  /// they start from a randomly seeded base, so a restarted node does not
  /// reuse the creation of its previous incarnation.
  pub(crate) fn fresh(name: NodeName) -> Self {
    static SEED: OnceLock<u32> = OnceLock::new();
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seed: u32 = *SEED.get_or_init(|| {
      let hash: u64 = RandomState::new().hash_one((Runtime::time().as_nanos(), process::id()));
      (hash ^ (hash >> 32)) as u32
    });

    Self::new(name, seed.wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed)))
  }

  /// Returns the node name.
  #[inline]
  pub const fn name(&self) -> NodeName {
    self.name
  }

  /// Returns the creation counter.
  #[inline]
  pub const fn creation(&self) -> u32 {
    self.creation
  }
}

impl Debug for NodeId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for NodeId {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "{}#{}", self.name, self.creation)
  }
}
