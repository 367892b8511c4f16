// -----------------------------------------------------------------------------
// Local Name Registration
//
// BEAM Reference:
//   https://github.com/erlang/otp/blob/master/erts/emulator/beam/register.c
// -----------------------------------------------------------------------------

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::RwLockWriteGuard;

use crate::core::ProcessId;
use crate::node::NodeInner;
use crate::proc::ProcExternal;
use crate::raise;

/// Registers `name` for the local process `pid`.
///
/// # Panics
///
/// Raises exception if:
///
/// - Name is empty
/// - Name is already registered
/// - PID is not a live local process
/// - PID already has a registered name
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L2295>
pub(crate) fn proc_register(node: &NodeInner, pid: ProcessId, name: String) {
  if name.is_empty() {
    raise!(Error, BadArg, "empty name");
  }

  let mut name_guard: RwLockWriteGuard<'_, HashMap<String, ProcessId>> = node.names.write();

  let Entry::Vacant(name_entry) = name_guard.entry(name) else {
    raise!(Error, BadArg, "registered name");
  };

  let Some(proc) = node.find(pid) else {
    raise!(Error, BadArg, "not alive");
  };

  let mut proc_guard: RwLockWriteGuard<'_, ProcExternal> = proc.external.write();

  if !proc_guard.state.is_running() {
    raise!(Error, BadArg, "not alive");
  }

  if proc_guard.name.is_some() {
    raise!(Error, BadArg, "registered PID");
  }

  proc_guard.name = Some(name_entry.key().clone());
  name_entry.insert(pid);

  drop(proc_guard);
  drop(name_guard);
}

/// Unregisters `name`.
///
/// # Panics
///
/// Raises exception if the name is not registered.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L2309>
pub(crate) fn proc_unregister(node: &NodeInner, name: &str) {
  let mut name_guard: RwLockWriteGuard<'_, HashMap<String, ProcessId>> = node.names.write();

  let Some(pid) = name_guard.remove(name) else {
    raise!(Error, BadArg, "unregistered name");
  };

  if let Some(proc) = node.find(pid) {
    let mut proc_guard: RwLockWriteGuard<'_, ProcExternal> = proc.external.write();

    if proc_guard.name.as_deref() == Some(name) {
      proc_guard.name = None;
    }
  }

  drop(name_guard);
}

/// Releases the name of a terminating process.
pub(crate) fn proc_release(node: &NodeInner, name: &str, pid: ProcessId) {
  let mut name_guard: RwLockWriteGuard<'_, HashMap<String, ProcessId>> = node.names.write();

  if name_guard.get(name) == Some(&pid) {
    name_guard.remove(name);
  } else {
    tracing::trace!(%name, "name already released");
  }
}

/// Looks up a PID by registered name.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L2327>
pub(crate) fn proc_whereis(node: &NodeInner, name: &str) -> Option<ProcessId> {
  node.names.read().get(name).copied()
}

/// Returns a snapshot of all registered names.
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/register.c#L576>
pub(crate) fn proc_registered(node: &NodeInner) -> Vec<String> {
  node.names.read().keys().cloned().collect()
}
