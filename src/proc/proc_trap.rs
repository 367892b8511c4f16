use std::mem;
use tokio::sync::Notify;
use triomphe::Arc;

use crate::core::Exit;
use crate::core::ProcessId;

/// Exit handler installed by [`Process::catch_exit`].
///
/// The signal loop stores a recognized exit in `caught` and wakes the
/// handler's future, which then abandons its body.
///
/// [`Process::catch_exit`]: crate::erts::Process::catch_exit
#[derive(Debug)]
pub(crate) struct ProcTrap {
  pub(crate) id: u64,
  pub(crate) accepts: fn(&mut Exit) -> bool,
  pub(crate) caught: Option<(Option<ProcessId>, Exit)>,
  pub(crate) notify: Arc<Notify>,
}

impl ProcTrap {
  #[inline]
  pub(crate) fn new(id: u64, accepts: fn(&mut Exit) -> bool) -> Self {
    Self {
      id,
      accepts,
      caught: None,
      notify: Arc::new(Notify::new()),
    }
  }

  /// Captures `exit` if this handler recognizes it.
  ///
  /// A handler captures at most one exit.
  pub(crate) fn try_catch(&mut self, from: Option<ProcessId>, exit: &mut Exit) -> bool {
    if self.caught.is_some() || !(self.accepts)(exit) {
      return false;
    }

    self.caught = Some((from, mem::replace(exit, Exit::Normal)));
    self.notify.notify_one();

    true
  }
}
