// -----------------------------------------------------------------------------
// Process Spawning
// -----------------------------------------------------------------------------

use futures::FutureExt;
use futures::future::CatchUnwind;
use parking_lot::MutexGuard;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tokio::task::futures::TaskLocalFuture;
use tracing::Span;
use tracing::span;
use triomphe::Arc;

use crate::bifs;
use crate::core::Exit;
use crate::core::MonitorRef;
use crate::core::ProcTableError;
use crate::core::ProcessId;
use crate::core::Term;
use crate::erts::Process;
use crate::erts::ProcessFlags;
use crate::erts::ProcessState;
use crate::erts::Signal;
use crate::erts::SignalDemonitor;
use crate::erts::SignalEmit;
use crate::erts::SignalExit;
use crate::erts::SignalKill;
use crate::erts::SignalLinkExit;
use crate::erts::SignalMonitorDown;
use crate::erts::SignalRecv;
use crate::erts::SignalUnlink;
use crate::erts::SpawnConfig;
use crate::erts::SpawnHandle;
use crate::node::NodeInner;
use crate::node::NodeRef;
use crate::proc;
use crate::proc::ProcData;
use crate::proc::ProcInternal;
use crate::proc::ProcMail;
use crate::proc::ProcReadOnly;
use crate::proc::ProcRecv;
use crate::proc::ProcSend;
use crate::proc::ProcTask;
use crate::raise;

/// Sends a trappable exit signal to `pid`.
///
/// Never fails for non-existent PIDs (signals are silently dropped).
///
/// BEAM Builtin: <https://github.com/erlang/otp/blob/master/erts/emulator/beam/bif.c#L1710>
pub(crate) fn proc_exit(node: &NodeInner, from: Option<ProcessId>, pid: ProcessId, exit: Exit) {
  SignalExit::new(from, exit).emit(node, pid);
}

/// Sends an untrappable exit signal to `pid`.
pub(crate) fn proc_kill(node: &NodeInner, from: Option<ProcessId>, pid: ProcessId, exit: Exit) {
  SignalKill::new(from, exit).emit(node, pid);
}

/// Spawns a new process on `node`.
///
/// # Spawn Sequence
///
/// 1. **Create Process**: Allocate state and assign PID
/// 2. **Initialize Link/Monitor**: Record the relationship on both sides
///    before the child can run, so it cannot terminate unobserved
/// 3. **Spawn Task**: Schedule the process future on Tokio
///
/// # Errors
///
/// Returns [`ProcTableError`] if the process table of `node` is full.
pub(crate) fn proc_spawn<F>(
  node: &NodeRef,
  parent: Option<&ProcTask>,
  opts: SpawnConfig,
  future: F,
) -> Result<SpawnHandle, ProcTableError>
where
  F: Future<Output = ()> + Send + 'static,
{
  if parent.is_none() && (opts.link || opts.monitor) {
    raise!(Error, SysInv, "link or monitor without parent");
  }

  // ---------------------------------------------------------------------------
  // 1. Create Process
  // ---------------------------------------------------------------------------

  let root: Option<ProcessId> = parent.map(ProcTask::pid);
  let (sig_send, sig_recv): (ProcSend, ProcRecv) = proc::unbounded_channel();

  let proc: Arc<ProcData> = node.procs.insert(|local| {
    let mpid: ProcessId = ProcessId::new(node.id, local);
    let readonly: ProcReadOnly = ProcReadOnly::new(mpid, sig_send, root);
    let mut internal: ProcInternal = ProcInternal::new(ProcMail::new(mpid, node.config.mailbox_warn_len));

    internal.flags.set(ProcessFlags::TRAP_EXIT, opts.trap_exit);

    ProcData::new(readonly, internal)
  })?;

  let mpid: ProcessId = proc.readonly.mpid;

  // ---------------------------------------------------------------------------
  // 2. Initialize Link/Monitor
  // ---------------------------------------------------------------------------

  let mut handle: SpawnHandle = SpawnHandle::Process(mpid);

  if let Some(parent) = parent {
    let mut child: MutexGuard<'_, ProcInternal> = proc.internal.lock();
    let mut owner: MutexGuard<'_, ProcInternal> = parent.internal();

    if opts.link {
      owner.links.insert(mpid);
      child.linked_by.insert(parent.pid());
    }

    if opts.monitor {
      let mref: MonitorRef = node.make_ref();

      owner.monitor_send.insert(mref, mpid);
      child.monitor_recv.insert(mref, parent.pid());

      handle = SpawnHandle::Monitor(mpid, mref);
    }
  }

  // ---------------------------------------------------------------------------
  // 3. Spawn Task
  // ---------------------------------------------------------------------------

  let context: ProcTask = ProcTask {
    inner: Arc::clone(&proc),
    node: NodeRef::clone(node),
  };

  let task: TaskLocalFuture<ProcTask, _> = Process::scope(context, proc_run(sig_recv, future));

  match root {
    Some(root) => tracing::debug!(pid = %mpid, from = %root, "Proc Spawn"),
    None => tracing::debug!(pid = %mpid, "Proc Spawn"),
  }

  drop(node.runtime.spawn(task));

  Ok(handle)
}

// The process task loop.
//
// Pending signals are applied before the body is polled again. Panics in the
// body are caught and become the exit reason.
async fn proc_run<F>(mut queue: ProcRecv, future: F)
where
  F: Future<Output = ()> + Send + 'static,
{
  let mut safe_task: Pin<Box<CatchUnwind<AssertUnwindSafe<F>>>> = Box::pin(AssertUnwindSafe(future).catch_unwind());

  let exit: Exit = 'run: loop {
    while let Ok(signal) = queue.try_recv() {
      if let Some(exit) = Process::with(|this| proc_handle_signal(this, signal)) {
        break 'run exit;
      }
    }

    tokio::select! {
      biased;
      Some(signal) = queue.recv() => {
        if let Some(exit) = Process::with(|this| proc_handle_signal(this, signal)) {
          break 'run exit;
        }
      }
      result = &mut safe_task => match result {
        Ok(()) => break 'run Exit::Normal,
        Err(error) => break 'run Exit::Term(Term::new_error(error)),
      }
    }
  };

  // Resources owned by the body are released before links fire.
  drop(safe_task);

  Process::with(|this| proc_terminate(this, &mut queue, exit));
}

/// Moves the process to [`ProcessState::Exiting`] and tears it down.
///
/// The signal queue is closed first. Link and monitor requests still queued
/// are answered with the exit reason instead of being dropped.
fn proc_terminate(this: &ProcTask, queue: &mut ProcRecv, exit: Exit) {
  {
    let mut external: _ = this.external.write();
    let _ignore: Result<(), Exit> = external.exit.set(exit.clone());
    external.state = ProcessState::Exiting;
  }

  tracing::debug!(pid = %this.pid(), %exit, "Proc Exit");

  queue.close();

  while let Ok(signal) = queue.try_recv() {
    if let Some((pid, reply)) = signal.bounce(this.pid(), &exit) {
      this.node.deliver(pid, reply);
    }
  }

  proc_remove(this, exit);
}

/// Removes a process from its node during termination.
///
/// # Cleanup Protocol
///
/// 1. Take links and monitors, discard the mailbox
/// 2. Unregister name if present
/// 3. Send LINK_EXIT to every process linked to this one
/// 4. Send MONITOR_DOWN to every process monitoring this one
/// 5. Release links and monitors held by this process
/// 6. Remove from process table
///
/// # Invocation
///
/// Called by the task loop on termination, or by [`ProcTask::drop()`] when
/// the task is cancelled.
pub(crate) fn proc_remove(this: &ProcTask, exit: Exit) {
  let span: Span = tracing::trace_span!("Proc Delete", pid = %this.pid());
  let _enter: span::Entered<'_> = span.enter();

  let mpid: ProcessId = this.pid();
  let node: &NodeInner = &this.node;

  tracing::trace!("(1) - Lock");

  let mut internal: MutexGuard<'_, ProcInternal> = this.internal();

  let links: _ = mem::take(&mut internal.links);
  let linked_by: _ = mem::take(&mut internal.linked_by);
  let monitor_send: _ = mem::take(&mut internal.monitor_send);
  let monitor_recv: _ = mem::take(&mut internal.monitor_recv);

  internal.node_monitors.clear();
  internal.inbox.clear();
  internal.traps.clear();
  internal.deferred.clear();

  drop(internal);

  let name: Option<String> = {
    let mut external: _ = this.external.write();
    let _ignore: Result<(), Exit> = external.exit.set(exit.clone());
    external.state = ProcessState::Exiting;
    external.name.take()
  };

  tracing::trace!("(2) - Unregister Name");

  if let Some(name) = name {
    bifs::proc_release(node, &name, mpid);
  }

  tracing::trace!("(3) - Send Link `EXIT`");

  for pid in linked_by {
    SignalLinkExit::new(mpid, exit.clone()).emit(node, pid);
  }

  tracing::trace!("(4) - Send Monitor `DOWN`");

  for (mref, pid) in monitor_recv {
    SignalMonitorDown::new(mpid, mref, exit.clone()).emit(node, pid);
  }

  tracing::trace!("(5) - Release Links and Monitors");

  for pid in links {
    SignalUnlink::new(mpid).emit(node, pid);
  }

  for (mref, pid) in monitor_send {
    SignalDemonitor::new(mpid, mref).emit(node, pid);
  }

  node.watches.remove_origin(mpid);

  tracing::trace!("(6) - State");

  this.external.write().state = ProcessState::Terminated;

  if node.procs.remove(mpid.local()).is_none() {
    tracing::error!("dangling state");
  }

  if node.procs.is_empty() {
    node.drained.notify_waiters();
  }
}

/// Processes a signal in the context of the receiving process.
///
/// Returns `Some(Exit)` if the signal should terminate the process.
fn proc_handle_signal(this: &ProcTask, signal: Signal) -> Option<Exit> {
  signal.recv(this, &mut this.internal())
}
