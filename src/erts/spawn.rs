use serde::Deserialize;
use serde::Serialize;

use crate::consts;
use crate::core::MonitorRef;
use crate::core::ProcessId;

// -----------------------------------------------------------------------------
// Spawn Config
// -----------------------------------------------------------------------------

/// Options used to configure a spawned process.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct SpawnConfig {
  /// Links the parent process to the new process.
  ///
  /// This is the same as calling [`Process::spawn_link`].
  ///
  /// [`Process::spawn_link`]: crate::erts::Process::spawn_link
  pub link: bool,
  /// Monitors the new process.
  ///
  /// This is the same as calling [`Process::spawn_monitor`].
  ///
  /// [`Process::spawn_monitor`]: crate::erts::Process::spawn_monitor
  pub monitor: bool,
  /// Sets the [`TRAP_EXIT`] process flag of the spawned process.
  ///
  /// [`TRAP_EXIT`]: crate::erts::ProcessFlags::TRAP_EXIT
  pub trap_exit: bool,
}

impl SpawnConfig {
  #[inline]
  pub const fn new() -> Self {
    Self {
      link: false,
      monitor: false,
      trap_exit: consts::SPAWN_INIT_TRAP_EXIT,
    }
  }

  #[inline]
  pub const fn new_link() -> Self {
    let mut this: Self = Self::new();
    this.link = true;
    this
  }

  #[inline]
  pub const fn new_monitor() -> Self {
    let mut this: Self = Self::new();
    this.monitor = true;
    this
  }
}

impl Default for SpawnConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

// -----------------------------------------------------------------------------
// Spawn Handle
// -----------------------------------------------------------------------------

/// A handle to a spawned process.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpawnHandle {
  /// A normal process.
  Process(ProcessId),
  /// A monitored process.
  Monitor(ProcessId, MonitorRef),
}

impl SpawnHandle {
  /// Returns the identifier of the spawned process.
  #[inline]
  pub const fn pid(&self) -> ProcessId {
    match self {
      Self::Process(pid) => *pid,
      Self::Monitor(pid, _) => *pid,
    }
  }

  /// Returns `true` if the spawn handle is a normal process.
  #[inline]
  pub const fn is_process(&self) -> bool {
    matches!(self, Self::Process(_))
  }

  /// Returns `true` if the spawn handle is a monitored process.
  #[inline]
  pub const fn is_monitor(&self) -> bool {
    matches!(self, Self::Monitor(_, _))
  }
}

// -----------------------------------------------------------------------------
// Spawn Error
// -----------------------------------------------------------------------------

/// The error type returned when a remote spawn fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SpawnError {
  /// The remote table of the target node has no entry with this name.
  #[error("no remote entry named `{0}`")]
  NotRegistered(String),
  /// The remote entry rejected its argument.
  #[error("bad argument: {0}")]
  BadArgument(String),
  /// The target node could not be reached.
  #[error("node disconnected")]
  Disconnected,
  /// The target node did not reply in time.
  #[error("spawn timed out")]
  Timeout,
  /// The process table of the target node is full.
  #[error("process table full")]
  SystemLimit,
}

// -----------------------------------------------------------------------------
// Spawn Reply
// -----------------------------------------------------------------------------

/// Reply to a remote spawn request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SpawnReply {
  pub(crate) sref: MonitorRef,
  pub(crate) result: Result<ProcessId, SpawnError>,
}
