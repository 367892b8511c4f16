use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;

/// A relationship between a local process and something on another node.
///
/// Fires with [`Exit::Disconnected`] if the connection to that node is lost
/// before the relationship is removed.
///
/// [`Exit::Disconnected`]: crate::core::Exit::Disconnected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Watch {
  Link {
    origin: ProcessId,
    target: ProcessId,
  },
  Monitor {
    origin: ProcessId,
    target: ProcessId,
    mref: MonitorRef,
  },
  Node {
    origin: ProcessId,
    mref: MonitorRef,
  },
}

impl Watch {
  #[inline]
  const fn origin(&self) -> ProcessId {
    match self {
      Self::Link { origin, .. } | Self::Monitor { origin, .. } | Self::Node { origin, .. } => *origin,
    }
  }
}

/// Remote relationships of local processes, keyed by remote node.
#[derive(Debug, Default)]
pub(crate) struct Watches {
  inner: Mutex<HashMap<NodeName, Vec<Watch>>>,
}

impl Watches {
  #[inline]
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn add_link(&self, origin: ProcessId, target: ProcessId) {
    self.insert(target.node().name(), Watch::Link { origin, target });
  }

  pub(crate) fn remove_link(&self, origin: ProcessId, target: ProcessId) {
    self.remove(target.node().name(), |watch| {
      *watch == Watch::Link { origin, target }
    });
  }

  pub(crate) fn add_monitor(&self, origin: ProcessId, target: ProcessId, mref: MonitorRef) {
    self.insert(target.node().name(), Watch::Monitor { origin, target, mref });
  }

  pub(crate) fn remove_monitor(&self, target: ProcessId, mref: MonitorRef) {
    self.remove(target.node().name(), |watch| {
      matches!(watch, Watch::Monitor { mref: other, .. } if *other == mref)
    });
  }

  pub(crate) fn add_node(&self, origin: ProcessId, node: NodeName, mref: MonitorRef) {
    self.insert(node, Watch::Node { origin, mref });
  }

  pub(crate) fn remove_node(&self, node: NodeName, mref: MonitorRef) {
    self.remove(node, |watch| {
      matches!(watch, Watch::Node { mref: other, .. } if *other == mref)
    });
  }

  /// Removes every relationship held by `origin`.
  pub(crate) fn remove_origin(&self, origin: ProcessId) {
    self.inner.lock().retain(|_, watches| {
      watches.retain(|watch| watch.origin() != origin);
      !watches.is_empty()
    });
  }

  /// Removes and returns every relationship towards `node`.
  pub(crate) fn take(&self, node: NodeName) -> Vec<Watch> {
    self.inner.lock().remove(&node).unwrap_or_default()
  }

  fn insert(&self, node: NodeName, watch: Watch) {
    self.inner.lock().entry(node).or_default().push(watch);
  }

  // Removes the first match only; each add is paired with one remove.
  fn remove<F>(&self, node: NodeName, filter: F)
  where
    F: Fn(&Watch) -> bool,
  {
    let mut inner: _ = self.inner.lock();

    let Some(watches) = inner.get_mut(&node) else {
      return;
    };

    if let Some(index) = watches.iter().position(filter) {
      watches.swap_remove(index);
    }

    if watches.is_empty() {
      inner.remove(&node);
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
