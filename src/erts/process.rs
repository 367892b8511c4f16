use std::future;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task;
use tokio::task::futures::TaskLocalFuture;
use tokio::time;
use triomphe::Arc;

use crate::bifs;
use crate::bifs::TrapGuard;
use crate::core::Exit;
use crate::core::Item;
use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Term;
use crate::erts::Envelope;
use crate::erts::Match;
use crate::erts::ProcessFlags;
use crate::erts::ProcessInfo;
use crate::erts::ReceivePort;
use crate::erts::SendPort;
use crate::erts::SpawnConfig;
use crate::erts::SpawnError;
use crate::erts::SpawnHandle;
use crate::erts::new_channel;
use crate::node::Node;
use crate::node::NodeRef;
use crate::proc::ProcTask;
use crate::raise;

// -----------------------------------------------------------------------------
// @data - Task Globals
// -----------------------------------------------------------------------------

tokio::task_local! {
  static CONTEXT: ProcTask;
}

// -----------------------------------------------------------------------------
// @api - Process
// -----------------------------------------------------------------------------

/// Process API, callable from inside a process body.
///
/// Every function raises an [`Exception`] when called outside of a process;
/// use [`Node`] to interact with processes from the outside.
///
/// [`Exception`]: crate::error::Exception
pub struct Process;

impl Process {
  /// Sets the task-local process context.
  #[inline]
  pub(crate) fn scope<F>(task: ProcTask, future: F) -> TaskLocalFuture<ProcTask, F>
  where
    F: Future,
  {
    CONTEXT.scope(task, future)
  }

  /// Accesses the current task-local process context and runs the given function.
  #[inline]
  pub(crate) fn with<F, R>(f: F) -> R
  where
    F: FnOnce(&ProcTask) -> R,
  {
    match CONTEXT.try_with(f) {
      Ok(result) => result,
      Err(error) => raise!(Error, SysInv, error),
    }
  }

  /// Like [`with`] but returns `None` outside of a process.
  ///
  /// [`with`]: Self::with
  #[inline]
  pub(crate) fn try_with<F, R>(f: F) -> Option<R>
  where
    F: FnOnce(&ProcTask) -> R,
  {
    CONTEXT.try_with(f).ok()
  }

  // ---------------------------------------------------------------------------
  // General API
  // ---------------------------------------------------------------------------

  /// Returns the process identifier of the calling process.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#self/0>
  pub fn this() -> ProcessId {
    Self::with(ProcTask::pid)
  }

  /// Returns a handle to the node hosting the calling process.
  pub fn node() -> Node {
    Self::with(|this| Node::from_inner(NodeRef::clone(&this.node)))
  }

  /// Returns the identifiers of all processes on the local node.
  ///
  /// Notice that an exiting process exists, but is not alive. That is,
  /// [`Process::alive`] returns false for an exiting process, but its process
  /// identifier is part of the result returned from [`Process::list`].
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#processes/0>
  pub fn list() -> Vec<ProcessId> {
    Self::with(|this| bifs::proc_list(&this.node))
  }

  /// Sleeps the current process for the given `timeout`.
  ///
  /// Signals are still processed while sleeping.
  pub async fn sleep(timeout: Duration) {
    time::sleep(timeout).await
  }

  /// Yields execution back to the runtime.
  pub async fn yield_now() {
    task::yield_now().await;
  }

  /// Returns `true` if the local process `pid` exists and is not exiting.
  ///
  /// Remote processes always report `false`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#is_process_alive/1>
  pub fn alive(pid: ProcessId) -> bool {
    Self::with(|this| bifs::proc_alive(&this.node, pid))
  }

  /// Returns information about the local process `pid`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#process_info/1>
  pub fn info(pid: ProcessId) -> Option<ProcessInfo> {
    Self::with(|this| bifs::proc_info(&this.node, pid))
  }

  /// Returns the process flags of the calling process.
  pub fn get_flags() -> ProcessFlags {
    Self::with(bifs::proc_get_flags)
  }

  /// Sets the process flags of the calling process.
  pub fn set_flags(flags: ProcessFlags) {
    Self::with(|this| bifs::proc_set_flags(this, flags))
  }

  /// Sets the process flag indicated to the specified value.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#process_flag/2>
  pub fn set_flag(flag: ProcessFlags, value: bool) {
    Self::with(|this| bifs::proc_set_flag(this, flag, value))
  }

  // ---------------------------------------------------------------------------
  // General API - Termination
  // ---------------------------------------------------------------------------

  /// Sends a trappable exit signal with the given `reason` to `pid`.
  ///
  /// The target runs an installed [`catch_exit`] handler for the reason's
  /// type, traps the signal if it has [`TRAP_EXIT`] set, or terminates.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#exit/2>
  ///
  /// [`catch_exit`]: Self::catch_exit
  /// [`TRAP_EXIT`]: ProcessFlags::TRAP_EXIT
  pub fn exit(pid: ProcessId, reason: impl Into<Exit>) {
    Self::with(|this| bifs::proc_exit(&this.node, Some(this.pid()), pid, reason.into()))
  }

  /// Terminates `pid` with the given `reason`.
  ///
  /// The signal cannot be trapped or handled.
  pub fn kill(pid: ProcessId, reason: impl Into<Exit>) {
    Self::with(|this| bifs::proc_kill(&this.node, Some(this.pid()), pid, reason.into()))
  }

  /// Terminates the calling process with the given `reason`.
  ///
  /// Exit handlers are bypassed. Takes effect at the next scheduling point,
  /// so the returned future never completes.
  pub async fn die<T>(reason: impl Into<Exit>) -> T {
    Self::with(|this| bifs::proc_kill(&this.node, Some(this.pid()), this.pid(), reason.into()));
    future::pending().await
  }

  /// Runs `body`, handing exit signals with a reason of type `R` to `handler`.
  ///
  /// When such a signal arrives, `body` is dropped at its current suspension
  /// point, the exit is cancelled, and `handler` receives the sender and
  /// reason. A handler for [`Exit`] accepts every reason. Handlers nest; the
  /// innermost matching handler wins. Exits that arrive before a captured
  /// exit reaches its handler are held back and dispatched afterwards, in
  /// order. Kill signals are never handled.
  pub async fn catch_exit<R, T, F, H, HF>(body: F, handler: H) -> T
  where
    R: Item,
    F: Future<Output = T>,
    H: FnOnce(Option<ProcessId>, R) -> HF,
    HF: Future<Output = T>,
  {
    let guard: TrapGuard = Self::with(|this| bifs::trap_install(this, bifs::trap_accepts::<R>));
    let notify: Arc<Notify> = guard.notify();

    let value: Option<T> = tokio::select! {
      biased;
      () = notify.notified() => None,
      value = body => Some(value),
    };

    let caught: Option<(Option<ProcessId>, Exit)> = guard.finish();

    drop(guard);

    match (value, caught) {
      (Some(value), _) => value,
      (None, Some((from, exit))) => handler(from, bifs::trap_reason::<R>(exit)).await,
      (None, None) => raise!(Error, SysInv, "exit handler woken without an exit"),
    }
  }

  // ---------------------------------------------------------------------------
  // General API - Spawning & Messaging
  // ---------------------------------------------------------------------------

  /// Spawns a new process to handle `future`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#spawn/1>
  pub fn spawn<F>(future: F) -> ProcessId
  where
    F: Future<Output = ()> + Send + 'static,
  {
    Self::spawn_opt(future, SpawnConfig::new()).pid()
  }

  /// Spawns a new process to handle `future`, linking the caller to it.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#spawn_link/1>
  pub fn spawn_link<F>(future: F) -> ProcessId
  where
    F: Future<Output = ()> + Send + 'static,
  {
    Self::spawn_opt(future, SpawnConfig::new_link()).pid()
  }

  /// Spawns a new atomically monitored process to handle `future`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#spawn_monitor/1>
  pub fn spawn_monitor<F>(future: F) -> (ProcessId, MonitorRef)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    match Self::spawn_opt(future, SpawnConfig::new_monitor()) {
      SpawnHandle::Process(_) => raise!(Error, SysInv, "monitor spawn without monitor"),
      SpawnHandle::Monitor(process, monitor) => (process, monitor),
    }
  }

  /// Spawns a new process with the given `opts` to handle `future`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#spawn_opt/2>
  ///
  /// # Errors
  ///
  /// Raises [`Exception`] if the process table is full.
  ///
  /// [`Exception`]: crate::error::Exception
  pub fn spawn_opt<F>(future: F, opts: SpawnConfig) -> SpawnHandle
  where
    F: Future<Output = ()> + Send + 'static,
  {
    Self::with(|this| match bifs::proc_spawn(&this.node, Some(this), opts, future) {
      Ok(handle) => handle,
      Err(error) => raise!(Error, SysCap, error),
    })
  }

  /// Spawns the entry `name` of the remote table of `node` with `args`.
  ///
  /// Spawning on the local node looks in the local remote table.
  ///
  /// # Errors
  ///
  /// Returns [`SpawnError`] if the entry is unknown or rejects `args`, or if
  /// `node` is unreachable or does not reply in time.
  pub async fn spawn_remote<T>(node: impl Into<NodeName>, name: &str, args: T) -> Result<ProcessId, SpawnError>
  where
    T: Item,
  {
    let this: NodeRef = Self::with(|this| NodeRef::clone(&this.node));
    this.spawn_remote(node.into(), name, Term::new(args)).await
  }

  /// Sends `message` to `pid`.
  ///
  /// Never blocks and never fails, whether `pid` exists, has terminated or
  /// is unreachable.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#send/2>
  pub fn send<T>(pid: ProcessId, message: T)
  where
    T: Item,
  {
    Self::with(|this| bifs::proc_send(&this.node, Some(this.pid()), pid, Term::new(message)))
  }

  /// Sends `message` to the process registered as `name` on the local node.
  ///
  /// Messages to unregistered names are dropped.
  pub fn send_named<T>(name: &str, message: T)
  where
    T: Item,
  {
    Self::with(|this| bifs::proc_send_named(&this.node, Some(this.pid()), name, Term::new(message)))
  }

  /// Sends `message` to the process registered as `name` on `node`.
  pub fn send_named_on<T>(node: impl Into<NodeName>, name: &str, message: T)
  where
    T: Item,
  {
    Self::with(|this| {
      bifs::proc_send_named_on(&this.node, Some(this.pid()), node.into(), name, Term::new(message))
    })
  }

  // ---------------------------------------------------------------------------
  // General API - Receiving
  // ---------------------------------------------------------------------------

  /// Waits for the oldest message of type `T`.
  ///
  /// REF: <https://www.erlang.org/doc/system/expressions.html#receive>
  pub async fn receive<T>() -> T
  where
    T: Item,
  {
    Self::receive_match(vec![Match::new::<T>(|value| value)]).await
  }

  /// Waits up to `timeout` for the oldest message of type `T`.
  ///
  /// Returns `None` on timeout; nothing is consumed.
  pub async fn receive_timeout<T>(timeout: Duration) -> Option<T>
  where
    T: Item,
  {
    Self::receive_match_timeout(vec![Match::new::<T>(|value| value)], timeout).await
  }

  /// Waits for the oldest message of any type.
  pub async fn receive_any() -> Envelope {
    Self::receive_match(vec![Match::any(|envelope| envelope)]).await
  }

  /// Waits up to `timeout` for the oldest message of any type.
  pub async fn receive_any_timeout(timeout: Duration) -> Option<Envelope> {
    Self::receive_match_timeout(vec![Match::any(|envelope| envelope)], timeout).await
  }

  /// Waits for a message or channel value accepted by one of `matches`.
  ///
  /// See [`Match`] for the precedence rules.
  pub async fn receive_match<R>(matches: Vec<Match<'_, R>>) -> R {
    match bifs::proc_receive(matches, None).await {
      Some(result) => result,
      None => raise!(Error, SysInv, "unbounded receive timed out"),
    }
  }

  /// Waits up to `timeout` for a message or channel value accepted by one of
  /// `matches`.
  ///
  /// A zero timeout checks without waiting.
  pub async fn receive_match_timeout<R>(matches: Vec<Match<'_, R>>, timeout: Duration) -> Option<R> {
    bifs::proc_receive(matches, Some(timeout)).await
  }

  // ---------------------------------------------------------------------------
  // General API - Links & Monitors
  // ---------------------------------------------------------------------------

  /// Links the calling process to `pid`.
  ///
  /// Links are unidirectional: the caller receives an exit signal when `pid`
  /// terminates, normally or not. If `pid` does not exist the link fires
  /// immediately with [`Exit::NoProc`]. Linking to self does nothing.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#link/1>
  pub fn link(pid: ProcessId) {
    Self::with(|this| bifs::proc_link(this, pid))
  }

  /// Removes the link from the calling process to `pid`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#unlink/1>
  pub fn unlink(pid: ProcessId) {
    Self::with(|this| bifs::proc_unlink(this, pid))
  }

  /// Starts monitoring `pid` from the calling process.
  ///
  /// A [`DownMessage`] is delivered when `pid` terminates, or immediately
  /// with [`Exit::NoProc`] if it does not exist.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#monitor/2>
  ///
  /// [`DownMessage`]: crate::erts::DownMessage
  pub fn monitor(pid: ProcessId) -> MonitorRef {
    Self::with(|this| bifs::proc_monitor(this, pid))
  }

  /// Turns off the monitor identified by `mref`.
  ///
  /// A [`DownMessage`] for `mref` already in the mailbox is removed. Returns
  /// `false` if the monitor was no longer active.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#demonitor/2>
  ///
  /// [`DownMessage`]: crate::erts::DownMessage
  pub fn demonitor(mref: MonitorRef) -> bool {
    Self::with(|this| bifs::proc_demonitor(this, mref))
  }

  /// Monitors the connection to `node`.
  ///
  /// A [`NodeDownMessage`] is delivered when the connection fails or is
  /// lost.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#monitor_node/2>
  ///
  /// [`NodeDownMessage`]: crate::erts::NodeDownMessage
  pub fn monitor_node(node: impl Into<NodeName>) -> MonitorRef {
    Self::with(|this| bifs::proc_monitor_node(this, node.into()))
  }

  /// Turns off the node monitor identified by `mref`.
  pub fn demonitor_node(mref: MonitorRef) -> bool {
    Self::with(|this| bifs::proc_demonitor_node(this, mref))
  }

  // ---------------------------------------------------------------------------
  // General API - Local Name Registration
  // ---------------------------------------------------------------------------

  /// Registers the local process `pid` under `name`.
  ///
  /// The name is released when the process terminates.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#register/2>
  ///
  /// # Errors
  ///
  /// Raises [`Exception`] in the following cases:
  ///
  /// - The PID is not alive
  /// - The PID is currently registered under a different name
  /// - The name is already registered to another PID
  ///
  /// [`Exception`]: crate::error::Exception
  pub fn register(pid: ProcessId, name: impl Into<String>) {
    Self::with(|this| bifs::proc_register(&this.node, pid, name.into()))
  }

  /// Removes the registered `name`.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#unregister/1>
  ///
  /// # Errors
  ///
  /// Raises [`Exception`] if the name is not registered to any PID.
  ///
  /// [`Exception`]: crate::error::Exception
  pub fn unregister(name: &str) {
    Self::with(|this| bifs::proc_unregister(&this.node, name))
  }

  /// Returns the PID under `name`, or `None` if the name is not registered.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#whereis/1>
  pub fn whereis(name: &str) -> Option<ProcessId> {
    Self::with(|this| bifs::proc_whereis(&this.node, name))
  }

  /// Returns every name registered on the local node.
  ///
  /// REF: <https://www.erlang.org/doc/apps/erts/erlang.html#registered/0>
  pub fn registered() -> Vec<String> {
    Self::with(|this| bifs::proc_registered(&this.node))
  }

  // ---------------------------------------------------------------------------
  // General API - Channels
  // ---------------------------------------------------------------------------

  /// Creates a typed channel owned by the local node.
  pub fn new_channel<T>() -> (SendPort<T>, ReceivePort<T>)
  where
    T: Item,
  {
    Self::with(|this| new_channel(&this.node))
  }
}
