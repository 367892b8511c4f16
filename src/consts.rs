//! Limits and default settings.

use std::time::Duration;

// -----------------------------------------------------------------------------
// Limits
// -----------------------------------------------------------------------------

/// Longest accepted [`NodeName`], in bytes.
///
/// [`NodeName`]: crate::core::NodeName
pub const MAX_NODE_NAME_BYTES: usize = 255;

/// Number of distinct [`NodeName`]s the process may ever intern.
///
/// [`NodeName`]: crate::core::NodeName
pub const MAX_NODE_NAME_COUNT: usize = 1 << 16;

/// A process table slot whose serial reaches this value is never handed out again.
pub const MAX_PROC_SERIAL: u32 = u32::MAX;

/// Largest distribution frame accepted from a peer, in bytes.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

// -----------------------------------------------------------------------------
// Process
// -----------------------------------------------------------------------------

/// Initial value of [`TRAP_EXIT`] for new processes.
///
/// [`TRAP_EXIT`]: crate::erts::ProcessFlags::TRAP_EXIT
pub const SPAWN_INIT_TRAP_EXIT: bool = false;

// -----------------------------------------------------------------------------
// Runtime
// -----------------------------------------------------------------------------

/// Worker count used when the host does not report its parallelism.
pub const DEFAULT_PARALLELISM: usize = 1;

/// Scheduler ticks between I/O and timer polls.
pub const DEFAULT_EVENT_INTERVAL: u32 = 61;

/// Scheduler ticks between checks of the injection queue.
pub const DEFAULT_GLOBAL_QUEUE_INTERVAL: u32 = 31;

/// Upper bound on the blocking thread pool.
pub const DEFAULT_MAX_BLOCKING_THREADS: usize = 512;

/// I/O events handled per driver tick.
pub const DEFAULT_MAX_IO_EVENTS_PER_TICK: usize = 1024;

/// Idle lifetime of a blocking pool thread.
pub const DEFAULT_THREAD_KEEP_ALIVE: Duration = Duration::from_secs(10);

/// Worker thread stack size, in bytes.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Grace period for tasks still running when a runtime or node stops.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

// -----------------------------------------------------------------------------
// Node
// -----------------------------------------------------------------------------

/// Live processes one node may host.
pub const DEFAULT_PROC_CAPACITY: usize = 1 << 20;

/// Time allowed to dial a peer and complete the handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a remote spawn waits for its reply.
pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Mailbox length that logs a one-time warning.
pub const DEFAULT_MAILBOX_WARN_LEN: usize = 100_000;

// -----------------------------------------------------------------------------
// Preallocation
// -----------------------------------------------------------------------------

/// Initial capacity of a process's received-message buffer.
pub const CAP_PROC_MSG_BUFFER: usize = 8;

/// Initial capacity of a node's name registry.
pub const CAP_REGISTERED_NAMES: usize = 32;
