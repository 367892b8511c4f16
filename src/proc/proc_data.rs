use hashbrown::HashMap;
use hashbrown::HashSet;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::core::Exit;
use crate::core::Item;
use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Term;
use crate::erts::Envelope;
use crate::erts::ExitMessage;
use crate::erts::ProcessFlags;
use crate::erts::ProcessState;
use crate::proc::ProcMail;
use crate::proc::ProcSend;
use crate::proc::ProcTrap;

// -----------------------------------------------------------------------------
// Proc Data
// -----------------------------------------------------------------------------

/// Top-level process data container with three locking domains.
///
/// 1. **Read-only**: No lock needed, contains immutable data
/// 2. **Internal**: Mutex-protected, touched by the owning task and by
///    short inspections such as [`Process::info`]
/// 3. **External**: RwLock-protected, contains rarely-modified state
///
/// [`Process::info`]: crate::erts::Process::info
#[derive(Debug)]
pub(crate) struct ProcData {
  pub(crate) readonly: ProcReadOnly,
  pub(crate) internal: Mutex<ProcInternal>,
  pub(crate) external: RwLock<ProcExternal>,
}

impl ProcData {
  #[inline]
  pub(crate) fn new(readonly: ProcReadOnly, internal: ProcInternal) -> Self {
    Self {
      readonly,
      internal: Mutex::new(internal),
      external: RwLock::new(ProcExternal::new()),
    }
  }

  /// Returns `true` if the process has not started exiting.
  #[inline]
  pub(crate) fn is_running(&self) -> bool {
    self.external.read().state == ProcessState::Running
  }

  /// Returns the recorded exit reason, if the process is exiting.
  #[inline]
  pub(crate) fn exit_reason(&self) -> Option<Exit> {
    self.external.read().exit.get().cloned()
  }
}

// -----------------------------------------------------------------------------
// Proc Read-only
// -----------------------------------------------------------------------------

/// Immutable process data accessible without locking.
#[derive(Debug)]
pub(crate) struct ProcReadOnly {
  /// PID of the process.
  pub(crate) mpid: ProcessId,
  /// Sending side of the process signal queue.
  pub(crate) send: ProcSend,
  /// Process that spawned this one.
  pub(crate) root: Option<ProcessId>,
  /// Process-unique identifier counter.
  pub(crate) puid: AtomicU64,
}

impl ProcReadOnly {
  #[inline]
  pub(crate) fn new(mpid: ProcessId, send: ProcSend, root: Option<ProcessId>) -> Self {
    Self {
      mpid,
      send,
      root,
      puid: AtomicU64::new(1),
    }
  }

  /// Returns the next process-unique identifier.
  #[inline]
  pub(crate) fn next_puid(&self) -> u64 {
    self.puid.fetch_add(1, Ordering::Relaxed)
  }
}

// -----------------------------------------------------------------------------
// Proc Internal
// -----------------------------------------------------------------------------

/// Mutable process state.
///
/// Links are unidirectional: `links` holds the processes this one is
/// notified about, `linked_by` holds the processes to notify when this one
/// terminates. Monitors follow the same split.
#[derive(Debug)]
pub(crate) struct ProcInternal {
  /// Process flags.
  pub(crate) flags: ProcessFlags,
  /// Internal message queue.
  pub(crate) inbox: ProcMail,
  /// Processes whose termination is propagated to this one.
  pub(crate) links: HashSet<ProcessId>,
  /// Processes notified when this one terminates.
  pub(crate) linked_by: HashSet<ProcessId>,
  /// Monitors requested by this process, keyed to their target.
  pub(crate) monitor_send: HashMap<MonitorRef, ProcessId>,
  /// Monitors watching this process, keyed to their origin.
  pub(crate) monitor_recv: HashMap<MonitorRef, ProcessId>,
  /// Node monitors requested by this process.
  pub(crate) node_monitors: HashMap<MonitorRef, NodeName>,
  /// Installed exit handlers, innermost last.
  pub(crate) traps: Vec<ProcTrap>,
  /// Trappable exits received while a handler holds an unhandled capture.
  pub(crate) deferred: VecDeque<(Option<ProcessId>, Exit)>,
}

impl ProcInternal {
  #[inline]
  pub(crate) fn new(inbox: ProcMail) -> Self {
    Self {
      flags: ProcessFlags::empty(),
      inbox,
      links: HashSet::new(),
      linked_by: HashSet::new(),
      monitor_send: HashMap::new(),
      monitor_recv: HashMap::new(),
      node_monitors: HashMap::new(),
      traps: Vec::new(),
      deferred: VecDeque::new(),
    }
  }

  /// Appends a message to the end of the process inbox. The caller must
  /// ensure signal-ordering is preserved.
  #[inline]
  pub(crate) fn send<T>(&mut self, from: Option<ProcessId>, message: T)
  where
    T: Item,
  {
    self.inbox.push(Envelope::new(from, Term::new(message)));
  }

  /// Applies a trappable exit signal.
  ///
  /// Installed exit handlers are consulted innermost first; a handler that
  /// recognizes the reason captures it and the exit is cancelled. Otherwise
  /// the [`TRAP_EXIT`] flag converts the signal into an [`ExitMessage`].
  ///
  /// While a handler holds a capture its body has not yet abandoned, later
  /// exits are deferred until [`trap_resume`] replays them in arrival order.
  ///
  /// Returns the exit reason if the process must terminate.
  ///
  /// [`TRAP_EXIT`]: ProcessFlags::TRAP_EXIT
  /// [`trap_resume`]: Self::trap_resume
  pub(crate) fn trap_exit(&mut self, from: Option<ProcessId>, mut exit: Exit) -> Option<Exit> {
    if self.trap_pending() {
      self.deferred.push_back((from, exit));
      tracing::trace!(result = "deferred", reason = "handler busy");
      return None;
    }

    for trap in self.traps.iter_mut().rev() {
      if trap.try_catch(from, &mut exit) {
        tracing::trace!(result = "caught", reason = "handler");
        return None;
      }
    }

    if self.flags.contains(ProcessFlags::TRAP_EXIT) {
      self.send(from, ExitMessage::new(from, exit));
      tracing::trace!(result = "trapped", reason = "proc flag");
      return None;
    }

    tracing::trace!(result = "terminated", exit = %exit);

    Some(exit)
  }

  /// Returns `true` if a handler holds a capture it has not taken yet.
  #[inline]
  pub(crate) fn trap_pending(&self) -> bool {
    self.traps.iter().any(|trap| trap.caught.is_some())
  }

  /// Replays deferred exits until one is captured or none remain.
  ///
  /// Returns the exit reason if a replayed exit terminates the process.
  pub(crate) fn trap_resume(&mut self) -> Option<Exit> {
    while !self.trap_pending() {
      let (from, exit): (Option<ProcessId>, Exit) = self.deferred.pop_front()?;

      if let Some(exit) = self.trap_exit(from, exit) {
        return Some(exit);
      }
    }

    None
  }
}

// -----------------------------------------------------------------------------
// Proc External
// -----------------------------------------------------------------------------

/// Rarely-modified process state.
#[derive(Debug)]
pub(crate) struct ProcExternal {
  /// Registered name (if any).
  pub(crate) name: Option<String>,
  /// Exit reason (set once on termination).
  pub(crate) exit: OnceLock<Exit>,
  /// Termination state.
  pub(crate) state: ProcessState,
}

impl ProcExternal {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      name: None,
      exit: OnceLock::new(),
      state: ProcessState::Running,
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::bifs::trap_accepts;
  use crate::core::Exit;
  use crate::core::LocalPid;
  use crate::core::NodeId;
  use crate::core::NodeName;
  use crate::core::ProcessId;
  use crate::proc::ProcInternal;
  use crate::proc::ProcMail;
  use crate::proc::ProcTrap;

  fn internal() -> ProcInternal {
    let owner: ProcessId = ProcessId::new(NodeId::new(NodeName::new("trap-test"), 1), LocalPid::new(1, 0));
    ProcInternal::new(ProcMail::new(owner, None))
  }

  fn caught(trap: &ProcTrap) -> Option<String> {
    trap.caught.as_ref().and_then(|(_, exit)| exit.reason::<String>())
  }

  #[test]
  fn test_exits_wait_for_busy_handler() {
    let mut internal: ProcInternal = internal();

    internal.traps.push(ProcTrap::new(1, trap_accepts::<String>));
    internal.traps.push(ProcTrap::new(2, trap_accepts::<String>));

    assert_eq!(internal.trap_exit(None, Exit::from("a")), None);
    assert_eq!(internal.trap_exit(None, Exit::from("b")), None);
    assert_eq!(internal.trap_exit(None, Exit::from("c")), None);

    assert_eq!(caught(&internal.traps[1]).as_deref(), Some("a"));
    assert_eq!(caught(&internal.traps[0]), None);
    assert_eq!(internal.deferred.len(), 2);

    // The inner handler takes its exit; the next one goes to the outer handler.
    internal.traps.pop();
    assert_eq!(internal.trap_resume(), None);

    assert_eq!(caught(&internal.traps[0]).as_deref(), Some("b"));
    assert_eq!(internal.deferred.len(), 1);

    // With no handler left the remaining exit terminates the process.
    internal.traps.pop();
    assert_eq!(internal.trap_resume(), Some(Exit::from("c")));
    assert!(internal.deferred.is_empty());
  }
}
