// -----------------------------------------------------------------------------
// Process Monitor
// -----------------------------------------------------------------------------

use parking_lot::MutexGuard;

use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::erts::DownMessage;
use crate::erts::NodeDownMessage;
use crate::erts::SignalDemonitor;
use crate::erts::SignalEmit;
use crate::erts::SignalMonitor;
use crate::proc::ProcInternal;
use crate::proc::ProcTask;

/// Starts monitoring `pid` from the calling process.
///
/// A monitor on a missing process fires immediately with `noproc`.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L598>
pub(crate) fn proc_monitor(this: &ProcTask, pid: ProcessId) -> MonitorRef {
  let mref: MonitorRef = this.node.make_ref();

  this.internal().monitor_send.insert(mref, pid);

  if pid.node() != this.node.id {
    this.node.watches.add_monitor(this.pid(), pid, mref);
  }

  SignalMonitor::new(this.pid(), mref).emit(&this.node, pid);

  mref
}

/// Removes the monitor identified by `mref`.
///
/// A `DOWN` message for `mref` that is already in the mailbox is flushed.
/// Returns `false` if the monitor was not active.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L429>
pub(crate) fn proc_demonitor(this: &ProcTask, mref: MonitorRef) -> bool {
  let mut internal: MutexGuard<'_, ProcInternal> = this.internal();

  let Some(pid) = internal.monitor_send.remove(&mref) else {
    internal
      .inbox
      .retain(|message| message.term().downcast_ref::<DownMessage>().is_none_or(|down| down.mref() != mref));

    return false;
  };

  drop(internal);

  if pid.node() != this.node.id {
    this.node.watches.remove_monitor(pid, mref);
  }

  SignalDemonitor::new(this.pid(), mref).emit(&this.node, pid);

  true
}

/// Starts monitoring the connection to `node`.
///
/// A connection attempt is started if none exists. The monitor fires with a
/// [`NodeDownMessage`] when the connection fails or is lost. Each call
/// creates an independent monitor.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/dist.c#L5240>
pub(crate) fn proc_monitor_node(this: &ProcTask, node: NodeName) -> MonitorRef {
  let mref: MonitorRef = this.node.make_ref();

  this.internal().node_monitors.insert(mref, node);

  if node != this.node.id.name() {
    this.node.watches.add_node(this.pid(), node, mref);
    this.node.ensure_peer(node);
  }

  mref
}

/// Removes the node monitor identified by `mref`.
///
/// Returns `false` if the monitor was not active.
pub(crate) fn proc_demonitor_node(this: &ProcTask, mref: MonitorRef) -> bool {
  let mut internal: MutexGuard<'_, ProcInternal> = this.internal();

  let Some(node) = internal.node_monitors.remove(&mref) else {
    internal.inbox.retain(|message| {
      message
        .term()
        .downcast_ref::<NodeDownMessage>()
        .is_none_or(|down| down.mref() != mref)
    });

    return false;
  };

  drop(internal);

  this.node.watches.remove_node(node, mref);

  true
}
