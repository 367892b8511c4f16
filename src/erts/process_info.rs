use bitflags::bitflags;

use crate::core::MonitorRef;
use crate::core::ProcessId;

// -----------------------------------------------------------------------------
// Process Flags
// -----------------------------------------------------------------------------

bitflags! {
  /// Flags used to configure process behaviour.
  #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
  pub struct ProcessFlags: u32 {
    /// Convert trappable exit signals into [`ExitMessage`]s.
    ///
    /// [`ExitMessage`]: crate::erts::ExitMessage
    const TRAP_EXIT = 1 << 1;
  }
}

// -----------------------------------------------------------------------------
// Process State
// -----------------------------------------------------------------------------

/// Termination state of a process.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ProcessState {
  /// The process is executing its body.
  Running,
  /// The process is tearing down; its signal queue no longer accepts
  /// signals.
  Exiting,
  /// The process has been removed from its node.
  Terminated,
}

impl ProcessState {
  /// Returns `true` if the process has not started exiting.
  #[inline]
  pub const fn is_running(&self) -> bool {
    matches!(self, Self::Running)
  }
}

// -----------------------------------------------------------------------------
// Process Info
// -----------------------------------------------------------------------------

/// Snapshot of the state of a process.
#[derive(Clone, Debug)]
pub struct ProcessInfo {
  /// The process identifier.
  pub pid: ProcessId,
  /// The termination state.
  pub state: ProcessState,
  /// The registered name.
  pub name: Option<String>,
  /// The process flags.
  pub flags: ProcessFlags,
  /// Processes whose termination is propagated to this process.
  pub links: Vec<ProcessId>,
  /// Processes notified when this process terminates.
  pub linked_by: Vec<ProcessId>,
  /// Monitors held by this process.
  pub monitors: Vec<(MonitorRef, ProcessId)>,
  /// Processes monitoring this process.
  pub monitored_by: Vec<(MonitorRef, ProcessId)>,
  /// Number of messages in the mailbox.
  pub mailbox_len: usize,
  /// The process that spawned this one.
  pub root: Option<ProcessId>,
}
