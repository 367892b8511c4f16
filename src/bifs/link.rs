// -----------------------------------------------------------------------------
// Process Link
//
// Links are unidirectional: the caller is notified when the target
// terminates. A link towards a remote process is also recorded as a node
// watch, so it fires with `disconnected` if the connection is lost.
// -----------------------------------------------------------------------------

use crate::core::ProcessId;
use crate::erts::SignalEmit;
use crate::erts::SignalLink;
use crate::erts::SignalUnlink;
use crate::proc::ProcTask;

/// Links the calling process to `pid`.
///
/// # Link Protocol
///
/// 1. Add `pid` to the caller's link set (no-op if already present)
/// 2. Register a node watch if `pid` is remote
/// 3. Send LINK to `pid`; a missing or exiting target answers with
///    LINK_EXIT, carrying `noproc` or its recorded exit reason
///
/// Self-linking is ignored.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L134>
pub(crate) fn proc_link(this: &ProcTask, pid: ProcessId) {
  if this.pid() == pid {
    return; // Ignore, we can't link to ourselves
  }

  if !this.internal().links.insert(pid) {
    return; // Ignore, we dont need to update an active link
  }

  if pid.node() != this.node.id {
    this.node.watches.add_link(this.pid(), pid);
  }

  SignalLink::new(this.pid()).emit(&this.node, pid);
}

/// Removes the link from the calling process to `pid`.
///
/// The link is removed locally before UNLINK is sent, so a LINK_EXIT that
/// is already in flight is ignored.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L1212>
pub(crate) fn proc_unlink(this: &ProcTask, pid: ProcessId) {
  if !this.internal().links.remove(&pid) {
    return; // Ignore, we're not linked to PID
  }

  if pid.node() != this.node.id {
    this.node.watches.remove_link(this.pid(), pid);
  }

  SignalUnlink::new(this.pid()).emit(&this.node, pid);
}
