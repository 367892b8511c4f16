// Signal Handling
//
// Every interaction between processes travels as a signal through the
// target's ordered signal queue. Messages and control signals share the
// queue, so a message sent before an exit signal is always observed first.
//
// # Erlang References
//
// <https://www.erlang.org/doc/system/ref_man_processes#sending-exit-signals>
// <https://www.erlang.org/doc/system/ref_man_processes#receiving-exit-signals>
use serde::Deserialize;
use serde::Serialize;
use tracing::Span;
use tracing::span;

use crate::core::Exit;
use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Term;
use crate::erts::DownMessage;
use crate::erts::Envelope;
use crate::erts::NodeDownMessage;
use crate::node::NodeInner;
use crate::proc::ProcInternal;
use crate::proc::ProcTask;

// -----------------------------------------------------------------------------
// Signal Emit
// -----------------------------------------------------------------------------

/// Trait for sending signals to a process.
///
/// Delivery goes through [`NodeInner::deliver`], which routes the signal to
/// a local signal queue or to the connection of the owning node.
pub(crate) trait SignalEmit: Into<Signal> {
  /// Sends this signal to `to`.
  #[inline]
  fn emit(self, node: &NodeInner, to: ProcessId) {
    node.deliver(to, self.into());
  }
}

impl<T> SignalEmit for T where T: Into<Signal> {}

// -----------------------------------------------------------------------------
// Signal Recv
// -----------------------------------------------------------------------------

/// Trait for processing received signals.
pub(crate) trait SignalRecv {
  /// Processes this signal in the context of the receiving process.
  ///
  /// Returns [`Exit`] if the signal should terminate the process,
  /// or [`None`] if processing completes without termination.
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit>;
}

// -----------------------------------------------------------------------------
// Signal
// -----------------------------------------------------------------------------

/// Top-level signal type wrapping message and control signals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum Signal {
  Message(MessageSignal),
  Control(ControlSignal),
}

impl Signal {
  /// Returns the signal category as a short string ("M" or "C").
  #[inline]
  const fn kind(&self) -> &'static str {
    match self {
      Self::Message(_) => "M",
      Self::Control(_) => "C",
    }
  }

  #[inline]
  const fn sender(&self) -> Option<ProcessId> {
    match self {
      Self::Message(signal) => signal.sender(),
      Self::Control(signal) => signal.sender(),
    }
  }

  /// Converts a signal that reached a missing or exiting process into the
  /// notification its sender is owed.
  ///
  /// A link request is answered with a link exit and a monitor request with
  /// a monitor down, both carrying `exit`. Every other signal is dropped.
  pub(crate) fn bounce(self, to: ProcessId, exit: &Exit) -> Option<(ProcessId, Signal)> {
    match self {
      Self::Control(ControlSignal::Link(signal)) => {
        let reply: SignalLinkExit = SignalLinkExit::new(to, exit.clone());
        Some((signal.from, reply.into()))
      }
      Self::Control(ControlSignal::Monitor(signal)) => {
        let reply: SignalMonitorDown = SignalMonitorDown::new(to, signal.mref, exit.clone());
        Some((signal.from, reply.into()))
      }
      _ => None,
    }
  }
}

impl SignalRecv for Signal {
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    let span: Span = tracing::trace_span!(
      "Proc Signal",
      type = %self.kind(),
      from = ?self.sender(),
    );

    let _enter: span::Entered<'_> = span.enter();

    match self {
      Self::Message(signal) => signal.recv(task, internal),
      Self::Control(signal) => signal.recv(task, internal),
    }
  }
}

macro_rules! impl_from {
  ($wrapper:ident :: $variant:ident($signal:ident)) => {
    impl From<$signal> for $wrapper {
      #[inline]
      fn from(other: $signal) -> Self {
        Self::$variant(other)
      }
    }

    impl From<$signal> for Signal {
      #[inline]
      fn from(other: $signal) -> Self {
        <Self as From<$wrapper>>::from($wrapper::$variant(other))
      }
    }
  };
}

impl From<MessageSignal> for Signal {
  #[inline]
  fn from(other: MessageSignal) -> Self {
    Self::Message(other)
  }
}

impl From<ControlSignal> for Signal {
  #[inline]
  fn from(other: ControlSignal) -> Self {
    Self::Control(other)
  }
}

// -----------------------------------------------------------------------------
// Message Signal
// -----------------------------------------------------------------------------

/// Message signals containing user data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum MessageSignal {
  Send(SignalSend),
}

impl MessageSignal {
  #[inline]
  const fn sender(&self) -> Option<ProcessId> {
    match self {
      Self::Send(signal) => signal.from,
    }
  }
}

impl SignalRecv for MessageSignal {
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    match self {
      Self::Send(signal) => signal.recv(task, internal),
    }
  }
}

impl_from!(MessageSignal::Send(SignalSend));

// -----------------------------------------------------------------------------
// Control Signal
// -----------------------------------------------------------------------------

/// Control signals for process coordination and lifecycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum ControlSignal {
  // ---------------------------------------------------------------------------
  // Termination Signals
  // ---------------------------------------------------------------------------
  /// Trappable exit signal.
  Exit(SignalExit),
  /// Untrappable exit signal.
  Kill(SignalKill),
  // ---------------------------------------------------------------------------
  // Link Signals
  // ---------------------------------------------------------------------------
  /// Establish a link towards the receiver.
  Link(SignalLink),
  /// Remove a link towards the receiver.
  Unlink(SignalUnlink),
  /// Exit signal from a linked process.
  LinkExit(SignalLinkExit),
  // ---------------------------------------------------------------------------
  // Monitor Signals
  // ---------------------------------------------------------------------------
  /// Establish a monitor on the receiver.
  Monitor(SignalMonitor),
  /// Remove a monitor on the receiver.
  Demonitor(SignalDemonitor),
  /// Notification that a monitored process terminated.
  MonitorDown(SignalMonitorDown),
  /// Notification that a monitored node became unreachable.
  NodeDown(SignalNodeDown),
}

impl ControlSignal {
  #[inline]
  const fn sender(&self) -> Option<ProcessId> {
    match self {
      Self::Exit(signal) => signal.from,
      Self::Kill(signal) => signal.from,
      Self::Link(signal) => Some(signal.from),
      Self::Unlink(signal) => Some(signal.from),
      Self::LinkExit(signal) => Some(signal.from),
      Self::Monitor(signal) => Some(signal.from),
      Self::Demonitor(signal) => Some(signal.from),
      Self::MonitorDown(signal) => Some(signal.from),
      Self::NodeDown(_) => None,
    }
  }
}

impl SignalRecv for ControlSignal {
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    match self {
      Self::Exit(signal) => signal.recv(task, internal),
      Self::Kill(signal) => signal.recv(task, internal),
      Self::Link(signal) => signal.recv(task, internal),
      Self::Unlink(signal) => signal.recv(task, internal),
      Self::LinkExit(signal) => signal.recv(task, internal),
      Self::Monitor(signal) => signal.recv(task, internal),
      Self::Demonitor(signal) => signal.recv(task, internal),
      Self::MonitorDown(signal) => signal.recv(task, internal),
      Self::NodeDown(signal) => signal.recv(task, internal),
    }
  }
}

impl_from!(ControlSignal::Exit(SignalExit));
impl_from!(ControlSignal::Kill(SignalKill));
impl_from!(ControlSignal::Link(SignalLink));
impl_from!(ControlSignal::Unlink(SignalUnlink));
impl_from!(ControlSignal::LinkExit(SignalLinkExit));
impl_from!(ControlSignal::Monitor(SignalMonitor));
impl_from!(ControlSignal::Demonitor(SignalDemonitor));
impl_from!(ControlSignal::MonitorDown(SignalMonitorDown));
impl_from!(ControlSignal::NodeDown(SignalNodeDown));

// -----------------------------------------------------------------------------
// Signal - Send
// -----------------------------------------------------------------------------

/// Regular message signal containing user data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalSend {
  from: Option<ProcessId>,
  term: Term,
}

impl SignalSend {
  #[inline]
  pub(crate) const fn new(from: Option<ProcessId>, term: Term) -> Self {
    Self { from, term }
  }
}

// Send signal handling:
//
// The content of the message is moved to the internal inbox buffer.
impl SignalRecv for SignalSend {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "send", tag = %self.term.tag());

    internal.inbox.push(Envelope::new(self.from, self.term));

    tracing::trace!(result = "enqueue");

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - Exit
// -----------------------------------------------------------------------------

/// Trappable exit signal.
///
/// Sent via `Process::exit()`. Processing follows the handler path of
/// [`ProcInternal::trap_exit`]; a normal reason is not special-cased.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalExit {
  from: Option<ProcessId>,
  exit: Exit,
}

impl SignalExit {
  #[inline]
  pub(crate) const fn new(from: Option<ProcessId>, exit: Exit) -> Self {
    Self { from, exit }
  }
}

impl SignalRecv for SignalExit {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "exit", exit = %self.exit);

    internal.trap_exit(self.from, self.exit)
  }
}

// -----------------------------------------------------------------------------
// Signal - Kill
// -----------------------------------------------------------------------------

/// Untrappable exit signal.
///
/// Bypasses exit handlers and the [`TRAP_EXIT`] flag.
///
/// [`TRAP_EXIT`]: crate::erts::ProcessFlags::TRAP_EXIT
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalKill {
  from: Option<ProcessId>,
  exit: Exit,
}

impl SignalKill {
  #[inline]
  pub(crate) const fn new(from: Option<ProcessId>, exit: Exit) -> Self {
    Self { from, exit }
  }
}

impl SignalRecv for SignalKill {
  fn recv(self, _task: &ProcTask, _internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "kill", exit = %self.exit);
    tracing::trace!(result = "terminated", reason = "killed");

    Some(self.exit)
  }
}

// -----------------------------------------------------------------------------
// Signal - Link
// -----------------------------------------------------------------------------

/// Request to be notified when the receiver terminates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalLink {
  from: ProcessId,
}

impl SignalLink {
  #[inline]
  pub(crate) const fn new(from: ProcessId) -> Self {
    Self { from }
  }
}

impl SignalRecv for SignalLink {
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "link");

    if self.from == task.pid() {
      tracing::trace!(result = "ignored", reason = "self link");
    } else if internal.linked_by.insert(self.from) {
      tracing::trace!(result = "handled", reason = "new link");
    } else {
      tracing::trace!(result = "ignored", reason = "old link");
    }

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - Unlink
// -----------------------------------------------------------------------------

/// Request to remove a link towards the receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalUnlink {
  from: ProcessId,
}

impl SignalUnlink {
  #[inline]
  pub(crate) const fn new(from: ProcessId) -> Self {
    Self { from }
  }
}

impl SignalRecv for SignalUnlink {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "unlink");

    if internal.linked_by.remove(&self.from) {
      tracing::trace!(result = "handled");
    } else {
      tracing::trace!(result = "ignored", reason = "no link");
    }

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - LinkExit
// -----------------------------------------------------------------------------

/// Exit signal from a linked process.
///
/// Sent when a linked process terminates, normally or not, or when its
/// node becomes unreachable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalLinkExit {
  from: ProcessId,
  exit: Exit,
}

impl SignalLinkExit {
  #[inline]
  pub(crate) const fn new(from: ProcessId, exit: Exit) -> Self {
    Self { from, exit }
  }
}

impl SignalRecv for SignalLinkExit {
  /// Applies the exit if the link is still in place.
  ///
  /// The link is removed once it fires. Signals for links that have been
  /// removed with `unlink` are ignored.
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "link exit", exit = %self.exit);

    if !internal.links.remove(&self.from) {
      tracing::trace!(result = "ignored", reason = "no link");
      return None;
    }

    if self.from.node() != task.node.id {
      task.node.watches.remove_link(task.pid(), self.from);
    }

    internal.trap_exit(Some(self.from), self.exit)
  }
}

// -----------------------------------------------------------------------------
// Signal - Monitor
// -----------------------------------------------------------------------------

/// Request to monitor the receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalMonitor {
  from: ProcessId,
  mref: MonitorRef,
}

impl SignalMonitor {
  #[inline]
  pub(crate) const fn new(from: ProcessId, mref: MonitorRef) -> Self {
    Self { from, mref }
  }
}

impl SignalRecv for SignalMonitor {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "monitor", mref = %self.mref);

    match internal.monitor_recv.insert(self.mref, self.from) {
      Some(_) => tracing::trace!(result = "ignored", reason = "occupied"),
      None => tracing::trace!(result = "handled"),
    }

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - Demonitor
// -----------------------------------------------------------------------------

/// Request to remove a monitor on the receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalDemonitor {
  from: ProcessId,
  mref: MonitorRef,
}

impl SignalDemonitor {
  #[inline]
  pub(crate) const fn new(from: ProcessId, mref: MonitorRef) -> Self {
    Self { from, mref }
  }
}

impl SignalRecv for SignalDemonitor {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "demonitor", mref = %self.mref);

    match internal.monitor_recv.remove(&self.mref) {
      Some(_) => tracing::trace!(result = "handled", reason = "good mref"),
      None => tracing::trace!(result = "ignored", reason = "no monitor"),
    }

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - MonitorDown
// -----------------------------------------------------------------------------

/// Notification that a monitored process has terminated.
///
/// Delivered as a [`DownMessage`] unless the monitor has been removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalMonitorDown {
  from: ProcessId,
  mref: MonitorRef,
  exit: Exit,
}

impl SignalMonitorDown {
  #[inline]
  pub(crate) const fn new(from: ProcessId, mref: MonitorRef, exit: Exit) -> Self {
    Self { from, mref, exit }
  }
}

impl SignalRecv for SignalMonitorDown {
  fn recv(self, task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "monitor down", mref = %self.mref);

    let Some(target) = internal.monitor_send.remove(&self.mref) else {
      tracing::trace!(result = "ignored", reason = "no monitor");
      return None;
    };

    if target.node() != task.node.id {
      task.node.watches.remove_monitor(target, self.mref);
    }

    internal.send(Some(self.from), DownMessage::new(self.mref, target, self.exit));

    tracing::trace!(result = "handled", reason = "good mref");

    None
  }
}

// -----------------------------------------------------------------------------
// Signal - NodeDown
// -----------------------------------------------------------------------------

/// Notification that a monitored node has become unreachable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct SignalNodeDown {
  node: NodeName,
  mref: MonitorRef,
}

impl SignalNodeDown {
  #[inline]
  pub(crate) const fn new(node: NodeName, mref: MonitorRef) -> Self {
    Self { node, mref }
  }
}

impl SignalRecv for SignalNodeDown {
  fn recv(self, _task: &ProcTask, internal: &mut ProcInternal) -> Option<Exit> {
    tracing::trace!(signal = "node down", node = %self.node, mref = %self.mref);

    if internal.node_monitors.remove(&self.mref).is_none() {
      tracing::trace!(result = "ignored", reason = "no monitor");
      return None;
    }

    internal.send(None, NodeDownMessage::new(self.mref, self.node));

    tracing::trace!(result = "handled");

    None
  }
}

#[cfg(test)]
mod tests {
  use crate::core::Exit;
  use crate::core::LocalPid;
  use crate::core::MonitorRef;
  use crate::core::NodeId;
  use crate::core::NodeName;
  use crate::core::ProcessId;
  use crate::core::Term;
  use crate::erts::signal::ControlSignal;
  use crate::erts::signal::Signal;
  use crate::erts::signal::SignalExit;
  use crate::erts::signal::SignalLink;
  use crate::erts::signal::SignalMonitor;
  use crate::erts::signal::SignalSend;

  fn pid(index: u32) -> ProcessId {
    ProcessId::new(NodeId::new(NodeName::new("signal-test"), 1), LocalPid::new(index, 0))
  }

  #[test]
  fn test_conversion_keeps_sender() {
    let send: Signal = SignalSend::new(Some(pid(1)), Term::new(7_u32)).into();
    let exit: Signal = SignalExit::new(None, Exit::Normal).into();
    let link: Signal = SignalLink::new(pid(2)).into();

    assert!(matches!(send, Signal::Message(_)));
    assert!(matches!(exit, Signal::Control(ControlSignal::Exit(_))));
    assert!(matches!(link, Signal::Control(ControlSignal::Link(_))));

    assert_eq!(send.sender(), Some(pid(1)));
    assert_eq!(exit.sender(), None);
    assert_eq!(link.sender(), Some(pid(2)));
  }

  #[test]
  fn test_bounce_answers_requests_only() {
    let dead: ProcessId = pid(9);
    let mref: MonitorRef = MonitorRef::new(pid(1).node(), 4);

    let link: Signal = SignalLink::new(pid(1)).into();
    let monitor: Signal = SignalMonitor::new(pid(2), mref).into();
    let send: Signal = SignalSend::new(Some(pid(3)), Term::new(1_u8)).into();

    let reply: Option<(ProcessId, Signal)> = link.bounce(dead, &Exit::NoProc);
    assert!(matches!(reply, Some((to, Signal::Control(ControlSignal::LinkExit(_)))) if to == pid(1)));

    let reply: Option<(ProcessId, Signal)> = monitor.bounce(dead, &Exit::NoProc);
    assert!(matches!(reply, Some((to, Signal::Control(ControlSignal::MonitorDown(_)))) if to == pid(2)));

    assert!(send.bounce(dead, &Exit::NoProc).is_none());
  }
}
