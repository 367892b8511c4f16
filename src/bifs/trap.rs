// -----------------------------------------------------------------------------
// Exit Handlers
// -----------------------------------------------------------------------------

use std::any::Any;
use std::any::TypeId;
use tokio::sync::Notify;
use triomphe::Arc;

use crate::bifs::proc_kill;
use crate::core::Exit;
use crate::core::Item;
use crate::core::ProcessId;
use crate::erts::Process;
use crate::proc::ProcTask;
use crate::proc::ProcTrap;
use crate::raise;

/// Installed exit handler, removed from its process on drop.
#[derive(Debug)]
pub(crate) struct TrapGuard {
  id: u64,
  notify: Arc<Notify>,
}

impl TrapGuard {
  /// Returns the waker signalled when the handler captures an exit.
  #[inline]
  pub(crate) fn notify(&self) -> Arc<Notify> {
    Arc::clone(&self.notify)
  }

  /// Removes the handler, returning the exit it captured.
  pub(crate) fn finish(&self) -> Option<(Option<ProcessId>, Exit)> {
    Process::with(|this| trap_remove(this, self.id, false))
  }
}

// A guard dropped before `finish` hands its capture to the enclosing handlers.
impl Drop for TrapGuard {
  fn drop(&mut self) {
    let _ignore: Option<_> = Process::try_with(|this| trap_remove(this, self.id, true));
  }
}

/// Installs an exit handler on the calling process.
///
/// `accepts` decides whether the handler recognizes an exit reason; it may
/// decode the reason in place.
pub(crate) fn trap_install(this: &ProcTask, accepts: fn(&mut Exit) -> bool) -> TrapGuard {
  let trap: ProcTrap = ProcTrap::new(this.readonly.next_puid(), accepts);

  let guard: TrapGuard = TrapGuard {
    id: trap.id,
    notify: Arc::clone(&trap.notify),
  };

  this.internal().traps.push(trap);

  guard
}

/// Removes handler `id` and replays exits deferred while it held a capture.
///
/// With `requeue`, an unhandled capture goes back to the front of the
/// deferred exits instead of being returned.
fn trap_remove(this: &ProcTask, id: u64, requeue: bool) -> Option<(Option<ProcessId>, Exit)> {
  let mut internal: _ = this.internal();
  let index: usize = internal.traps.iter().rposition(|trap| trap.id == id)?;
  let mut caught: Option<(Option<ProcessId>, Exit)> = internal.traps.remove(index).caught;

  if requeue {
    if let Some(exit) = caught.take() {
      internal.deferred.push_front(exit);
    }
  }

  let exit: Option<Exit> = internal.trap_resume();

  drop(internal);

  // The exit already went through the handlers; a kill keeps it from
  // being handled twice.
  if let Some(exit) = exit {
    proc_kill(&this.node, Some(this.pid()), this.pid(), exit);
  }

  caught
}

/// Returns `true` if `exit` carries a reason of type `R`.
///
/// A handler for [`Exit`] itself accepts every reason.
pub(crate) fn trap_accepts<R>(exit: &mut Exit) -> bool
where
  R: Item,
{
  TypeId::of::<R>() == TypeId::of::<Exit>() || exit.resolve::<R>()
}

/// Extracts a reason accepted by [`trap_accepts`].
pub(crate) fn trap_reason<R>(exit: Exit) -> R
where
  R: Item,
{
  let boxed: Box<dyn Any> = Box::new(exit);

  let exit: Exit = match boxed.downcast::<R>() {
    Ok(reason) => return *reason,
    Err(boxed) => match boxed.downcast::<Exit>() {
      Ok(exit) => *exit,
      Err(_) => raise!(Error, SysInv, "exit handler lost its reason"),
    },
  };

  match exit.downcast::<R>() {
    Ok(reason) => reason,
    Err(_) => raise!(Error, SysInv, "exit handler accepted a different reason"),
  }
}
