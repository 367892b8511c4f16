//! Runtime bootstrap.
//!
//! [`block_on`] builds a multi-threaded tokio runtime, installs the tracing
//! subscriber and drives a future to completion on it. [`run_node`] does the
//! same for a node: it binds the node, hands it to the main future and shuts
//! it down once that future completes.
//!
//! Nodes can also be created inside any existing multi-threaded tokio
//! runtime.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
use tokio::runtime::Builder;
use tokio::runtime::Runtime as TokioRuntime;
use tracing::Instrument;
use tracing::Span;

use crate::dist::Transport;
use crate::erts::RuntimeConfig;
use crate::node::Node;
use crate::node::NodeError;
use crate::node::RemoteTable;
use crate::raise;

/// Runs `future` to completion on a new runtime.
///
/// This is the same as calling `block_on_opts(future, Default::default())`.
#[inline]
pub fn block_on<F>(future: F) -> F::Output
where
  F: Future,
{
  block_on_opts(future, Default::default())
}

/// Runs `future` to completion on a new runtime built from `config`.
///
/// The runtime is shut down before returning, waiting at most
/// `config.shutdown_timeout` for tasks still running.
///
/// # Panics
///
/// Raises an exception if the runtime cannot be built.
pub fn block_on_opts<F>(future: F, config: RuntimeConfig) -> F::Output
where
  F: Future,
{
  init_tracing_subscriber(&config);

  let runtime: TokioRuntime = match build_tokio_runtime(&config) {
    Ok(runtime) => runtime,
    Err(error) => raise!(Error, SysInv, error),
  };

  let span: Span = tracing::debug_span!(target: "tarazed", "init::block_on");

  let output: F::Output = runtime.block_on(future.instrument(span.clone()));

  tracing::debug!(
    target: "tarazed",
    parent: &span,
    timeout = ?config.shutdown_timeout,
    "System Stop",
  );

  let start: Instant = Instant::now();

  runtime.shutdown_timeout(config.shutdown_timeout);

  let elapsed: Duration = start.elapsed();

  tracing::debug!(target: "tarazed", parent: &span, ?elapsed, "System Stopped");

  output
}

/// Hosts a node bound to `address` on a new runtime and runs `main` on it.
///
/// This is the same as calling `run_node_opts` with the default
/// [`RuntimeConfig`].
///
/// # Errors
///
/// Returns [`NodeError`] if the node cannot be created.
#[inline]
pub fn run_node<T, F, Fut>(transport: T, address: &str, remote: RemoteTable, main: F) -> Result<Fut::Output, NodeError>
where
  T: Transport,
  F: FnOnce(Node) -> Fut,
  Fut: Future,
{
  run_node_opts(transport, address, remote, main, Default::default())
}

/// Hosts a node bound to `address` on a new runtime built from `config`.
///
/// `main` receives the node. The node is shut down when `main` completes,
/// killing every process still running on it.
///
/// # Errors
///
/// Returns [`NodeError`] if the node cannot be created.
pub fn run_node_opts<T, F, Fut>(
  transport: T,
  address: &str,
  remote: RemoteTable,
  main: F,
  config: RuntimeConfig,
) -> Result<Fut::Output, NodeError>
where
  T: Transport,
  F: FnOnce(Node) -> Fut,
  Fut: Future,
{
  let node_config: _ = config.node.clone();

  block_on_opts(
    async move {
      let node: Node = match Node::create_opt(transport, address, remote, node_config).await {
        Ok(node) => node,
        Err(error) => return Err(error),
      };

      let output: Fut::Output = main(node.clone()).await;

      node.shutdown().await;

      Ok(output)
    },
    config,
  )
}

/// Installs the global fmt subscriber.
///
/// An already installed subscriber is kept.
#[cfg(feature = "tracing")]
fn init_tracing_subscriber(config: &RuntimeConfig) {
  use tracing_subscriber::FmtSubscriber;
  use tracing_subscriber::fmt::format;
  use tracing_subscriber::util::SubscriberInitExt;

  let result: Result<(), _> = FmtSubscriber::builder()
    .event_format(format().compact())
    .log_internal_errors(true)
    .with_ansi(true)
    .with_file(config.log.source_location)
    .with_level(true)
    .with_line_number(config.log.source_location)
    .with_max_level(config.log.level)
    .with_target(config.log.target)
    .with_thread_ids(config.log.thread_info)
    .with_thread_names(config.log.thread_info)
    .finish()
    .try_init();

  if let Err(error) = result {
    tracing::debug!(target: "tarazed", %error, "tracing subscriber not installed");
  }
}

#[cfg(not(feature = "tracing"))]
fn init_tracing_subscriber(_config: &RuntimeConfig) {}

/// Builds the tokio multi-threaded runtime described by `config`.
fn build_tokio_runtime(config: &RuntimeConfig) -> std::io::Result<TokioRuntime> {
  Builder::new_multi_thread()
    .enable_io()
    .enable_time()
    .event_interval(config.event_interval)
    .global_queue_interval(config.global_queue_interval)
    .max_blocking_threads(config.max_blocking_threads)
    .max_io_events_per_tick(config.max_io_events_per_tick)
    .thread_keep_alive(config.thread_keep_alive)
    .thread_name_fn(next_worker_name)
    .thread_stack_size(config.thread_stack_size)
    .worker_threads(config.worker_threads)
    .build()
}

#[inline]
fn next_worker_name() -> String {
  static ID: AtomicU32 = AtomicU32::new(1);
  format!("tarazed-worker-{:0>2}", ID.fetch_add(1, Ordering::Relaxed))
}
