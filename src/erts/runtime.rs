use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use tracing::Level;

use crate::consts;
use crate::node::NodeConfig;

// -----------------------------------------------------------------------------
// Runtime
// -----------------------------------------------------------------------------

/// Host runtime information.
pub struct Runtime;

impl Runtime {
  /// Returns the number of available CPU cores.
  ///
  /// Falls back to [`DEFAULT_PARALLELISM`] if CPU detection fails.
  ///
  /// [`DEFAULT_PARALLELISM`]: consts::DEFAULT_PARALLELISM
  pub fn available_cpus() -> usize {
    thread::available_parallelism().map_or(consts::DEFAULT_PARALLELISM, |count| count.get())
  }

  /// Returns the time elapsed since the UNIX epoch.
  ///
  /// Clocks set before the epoch report [`Duration::ZERO`].
  pub fn time() -> Duration {
    SystemTime::now()
      .duration_since(SystemTime::UNIX_EPOCH)
      .unwrap_or(Duration::ZERO)
  }
}

// -----------------------------------------------------------------------------
// Log Config
// -----------------------------------------------------------------------------

/// Settings of the fmt subscriber installed by [`init`].
///
/// [`init`]: crate::init
#[derive(Clone, Debug)]
pub struct LogConfig {
  /// Most verbose level that is recorded.
  pub level: Level,
  /// Include the source file and line of each event.
  pub source_location: bool,
  /// Include the event target (the module path).
  pub target: bool,
  /// Include worker thread names and identifiers.
  pub thread_info: bool,
}

impl LogConfig {
  pub const fn new() -> Self {
    Self {
      level: Level::INFO,
      source_location: false,
      target: false,
      thread_info: true,
    }
  }

  /// Records spawn, exit and connection lifecycle events.
  pub const fn verbose() -> Self {
    Self {
      level: Level::DEBUG,
      ..Self::new()
    }
  }

  /// Records every signal applied by every process.
  pub const fn very_verbose() -> Self {
    Self {
      level: Level::TRACE,
      source_location: true,
      ..Self::new()
    }
  }
}

impl Default for LogConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

// -----------------------------------------------------------------------------
// Runtime Config
// -----------------------------------------------------------------------------

/// Configuration used by [`init`] to host a node.
///
/// Covers the tokio runtime, the tracing subscriber and the node itself.
///
/// [`init`]: crate::init
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
  /// Number of tokio worker threads.
  pub worker_threads: usize,
  /// Limit for threads in the blocking pool.
  pub max_blocking_threads: usize,
  /// Scheduler ticks between polls for external events.
  pub event_interval: u32,
  /// Scheduler ticks between polls of the global task queue.
  pub global_queue_interval: u32,
  /// Maximum number of I/O events processed per tick.
  pub max_io_events_per_tick: usize,
  /// Stack size in bytes of each worker thread.
  pub thread_stack_size: usize,
  /// How long idle blocking threads are kept alive.
  pub thread_keep_alive: Duration,
  /// How long to wait for tasks still running when the runtime stops.
  pub shutdown_timeout: Duration,
  /// Tracing subscriber settings.
  pub log: LogConfig,
  /// Settings of the node started by [`run_node_opts`].
  ///
  /// [`run_node_opts`]: crate::init::run_node_opts
  pub node: NodeConfig,
}

impl RuntimeConfig {
  pub fn new() -> Self {
    Self {
      worker_threads: Runtime::available_cpus(),
      max_blocking_threads: consts::DEFAULT_MAX_BLOCKING_THREADS,
      event_interval: consts::DEFAULT_EVENT_INTERVAL,
      global_queue_interval: consts::DEFAULT_GLOBAL_QUEUE_INTERVAL,
      max_io_events_per_tick: consts::DEFAULT_MAX_IO_EVENTS_PER_TICK,
      thread_stack_size: consts::DEFAULT_THREAD_STACK_SIZE,
      thread_keep_alive: consts::DEFAULT_THREAD_KEEP_ALIVE,
      shutdown_timeout: consts::SHUTDOWN_TIMEOUT,
      log: LogConfig::verbose(),
      node: NodeConfig::new(),
    }
  }
}

impl Default for RuntimeConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
