use parking_lot::MutexGuard;
use std::ops::Deref;
use triomphe::Arc;

use crate::bifs;
use crate::core::Exit;
use crate::core::ProcessId;
use crate::erts::ProcessState;
use crate::node::NodeRef;
use crate::proc::ProcData;
use crate::proc::ProcInternal;

/// Process task context that triggers cleanup on drop.
///
/// Stored in the task-local process context for the lifetime of the task.
///
/// # Drop Behavior
///
/// A task that is cancelled before it terminated normally (runtime shutdown,
/// for example) is removed from the process table with reason
/// [`Exit::Killed`], and its links and monitors fire.
#[derive(Debug)]
pub(crate) struct ProcTask {
  pub(crate) inner: Arc<ProcData>,
  pub(crate) node: NodeRef,
}

impl ProcTask {
  #[inline]
  pub(crate) fn pid(&self) -> ProcessId {
    self.inner.readonly.mpid
  }

  /// Locks the mutable process state.
  ///
  /// Must not be held across an `.await`.
  #[inline]
  pub(crate) fn internal(&self) -> MutexGuard<'_, ProcInternal> {
    self.inner.internal.lock()
  }
}

impl Drop for ProcTask {
  fn drop(&mut self) {
    if self.external.read().state == ProcessState::Terminated {
      return;
    }

    let exit: Exit = self.external.read().exit.get_or_init(|| Exit::Killed).clone();

    bifs::proc_remove(self, exit);
  }
}

impl Deref for ProcTask {
  type Target = ProcData;

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}
