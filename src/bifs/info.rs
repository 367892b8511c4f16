// -----------------------------------------------------------------------------
// Process Info & Flags
//
// Only processes hosted by the inspecting node can be inspected; remote
// identifiers report as not alive.
// -----------------------------------------------------------------------------

use parking_lot::MutexGuard;
use parking_lot::RwLockReadGuard;
use triomphe::Arc;

use crate::core::ProcessId;
use crate::erts::ProcessFlags;
use crate::erts::ProcessInfo;
use crate::node::NodeInner;
use crate::proc::ProcData;
use crate::proc::ProcExternal;
use crate::proc::ProcInternal;
use crate::proc::ProcTask;

/// Returns a list of all processes hosted by `node`.
///
/// Includes exiting processes (not yet fully terminated). The returned list
/// is a snapshot and may be stale immediately after returning.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L4078>
pub(crate) fn proc_list(node: &NodeInner) -> Vec<ProcessId> {
  node
    .procs
    .keys()
    .into_iter()
    .map(|local| ProcessId::new(node.id, local))
    .collect()
}

/// Checks if a process is alive.
///
/// Returns `true` if the process exists and has not started exiting.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/erl_bif_info.c#L3990>
pub(crate) fn proc_alive(node: &NodeInner, pid: ProcessId) -> bool {
  node.find(pid).is_some_and(|proc| proc.is_running())
}

/// Returns detailed information about a process.
///
/// Returns `None` if the process does not exist on `node`.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/erl_bif_info.c#L1558>
pub(crate) fn proc_info(node: &NodeInner, pid: ProcessId) -> Option<ProcessInfo> {
  let proc: Arc<ProcData> = node.find(pid)?;

  let internal: MutexGuard<'_, ProcInternal> = proc.internal.lock();
  let external: RwLockReadGuard<'_, ProcExternal> = proc.external.read();

  Some(ProcessInfo {
    pid,
    state: external.state,
    name: external.name.clone(),
    flags: internal.flags,
    links: internal.links.iter().copied().collect(),
    linked_by: internal.linked_by.iter().copied().collect(),
    monitors: internal.monitor_send.iter().map(|(mref, pid)| (*mref, *pid)).collect(),
    monitored_by: internal.monitor_recv.iter().map(|(mref, pid)| (*mref, *pid)).collect(),
    mailbox_len: internal.inbox.len(),
    root: proc.readonly.root,
  })
}

/// Returns the process flags of the calling process.
pub(crate) fn proc_get_flags(this: &ProcTask) -> ProcessFlags {
  this.internal().flags
}

/// Replaces every process flag of the calling process.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L2013>
pub(crate) fn proc_set_flags(this: &ProcTask, flags: ProcessFlags) {
  this.internal().flags = flags;
}

/// Sets one process flag of the calling process, leaving the others.
pub(crate) fn proc_set_flag(this: &ProcTask, flag: ProcessFlags, value: bool) {
  this.internal().flags.set(flag, value);
}
