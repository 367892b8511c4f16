use hashbrown::HashMap;
use parking_lot::Mutex;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::bifs;
use crate::consts::CAP_REGISTERED_NAMES;
use crate::core::ChannelId;
use crate::core::Exit;
use crate::core::MonitorRef;
use crate::core::NodeId;
use crate::core::NodeName;
use crate::core::ProcTable;
use crate::core::ProcessId;
use crate::core::Term;
use crate::dist::DistMessage;
use crate::dist::Endpoint;
use crate::dist::Transport;
use crate::erts::ChanSink;
use crate::erts::ChanTable;
use crate::erts::Process;
use crate::erts::Signal;
use crate::erts::SignalLinkExit;
use crate::erts::SignalMonitorDown;
use crate::erts::SignalNodeDown;
use crate::erts::SpawnConfig;
use crate::erts::SpawnError;
use crate::erts::SpawnReply;
use crate::node::NodeConfig;
use crate::node::RemoteTable;
use crate::node::peer;
use crate::node::peer::Peer;
use crate::node::peer::PeerDown;
use crate::node::peer::PeerState;
use crate::node::watch::Watch;
use crate::node::watch::Watches;
use crate::proc::ProcData;

pub(crate) type NodeRef = Arc<NodeInner>;
pub(crate) type NodeWeak = Weak<NodeInner>;

thread_local! {
  static CURRENT: RefCell<Option<NodeWeak>> = const { RefCell::new(None) };
}

// -----------------------------------------------------------------------------
// Node Inner
// -----------------------------------------------------------------------------

/// A remote spawn waiting for its reply.
pub(crate) struct PendingSpawn {
  node: NodeName,
  reply: oneshot::Sender<Result<ProcessId, SpawnError>>,
}

/// Shared state of one node.
///
/// Every signal leaving a process passes through [`deliver`], which keeps
/// sending location transparent: local targets get the signal pushed onto
/// their queue, remote targets get it forwarded over the peer connection.
///
/// [`deliver`]: Self::deliver
pub(crate) struct NodeInner {
  pub(crate) id: NodeId,
  pub(crate) weak: NodeWeak,
  pub(crate) config: NodeConfig,
  /// Local process table.
  pub(crate) procs: ProcTable<ProcData>,
  /// Signalled whenever the process table becomes empty.
  pub(crate) drained: Notify,
  /// Local name registry.
  pub(crate) names: RwLock<HashMap<String, ProcessId>>,
  /// Channel queues owned by this node.
  pub(crate) channels: ChanTable,
  pub(crate) remote: RemoteTable,
  pub(crate) transport: Arc<dyn Transport>,
  pub(crate) endpoint: Arc<dyn Endpoint>,
  /// Outgoing connections, one per remote node.
  pub(crate) peers: Mutex<HashMap<NodeName, Peer>>,
  /// Relationships of local processes towards remote nodes.
  pub(crate) watches: Watches,
  pub(crate) spawns: Mutex<HashMap<MonitorRef, PendingSpawn>>,
  /// Cancelled on shutdown.
  pub(crate) token: CancellationToken,
  pub(crate) runtime: Handle,
  pub(crate) next_ref: AtomicU64,
  pub(crate) next_chan: AtomicU64,
  pub(crate) next_peer: AtomicU64,
}

impl NodeInner {
  pub(crate) fn new(
    weak: NodeWeak,
    id: NodeId,
    config: NodeConfig,
    remote: RemoteTable,
    transport: Arc<dyn Transport>,
    endpoint: Arc<dyn Endpoint>,
    runtime: Handle,
  ) -> Self {
    Self {
      id,
      weak,
      procs: ProcTable::with_capacity(config.proc_capacity),
      drained: Notify::new(),
      names: RwLock::new(HashMap::with_capacity(CAP_REGISTERED_NAMES)),
      channels: Mutex::new(HashMap::new()),
      config,
      remote,
      transport,
      endpoint,
      peers: Mutex::new(HashMap::new()),
      watches: Watches::new(),
      spawns: Mutex::new(HashMap::new()),
      token: CancellationToken::new(),
      runtime,
      next_ref: AtomicU64::new(1),
      next_chan: AtomicU64::new(1),
      next_peer: AtomicU64::new(1),
    }
  }

  /// Returns the node the current thread is acting for.
  ///
  /// Set by [`enter`] while node code runs outside a process, otherwise
  /// taken from the calling process.
  ///
  /// [`enter`]: Self::enter
  pub(crate) fn current() -> Option<NodeRef> {
    let entered: Option<NodeRef> = CURRENT.with(|current| current.borrow().as_ref().and_then(Weak::upgrade));

    entered.or_else(|| Process::try_with(|this| NodeRef::clone(&this.node)))
  }

  /// Makes this node the [`current`] node until the guard is dropped.
  ///
  /// Values decoded under the guard, such as send ports, bind to this
  /// node. The guard must not be held across an `.await`.
  ///
  /// [`current`]: Self::current
  pub(crate) fn enter(&self) -> EnterGuard {
    let prev: Option<NodeWeak> = CURRENT.with(|current| current.replace(Some(self.weak.clone())));

    EnterGuard { prev }
  }

  /// Creates a new reference unique to this node incarnation.
  #[inline]
  pub(crate) fn make_ref(&self) -> MonitorRef {
    MonitorRef::new(self.id, self.next_ref.fetch_add(1, Ordering::Relaxed))
  }

  /// Returns the local process `pid`, if its entry still exists.
  #[inline]
  pub(crate) fn find(&self, pid: ProcessId) -> Option<triomphe::Arc<ProcData>> {
    if pid.node() != self.id {
      return None;
    }

    self.procs.get(pid.local())
  }

  // ---------------------------------------------------------------------------
  // Delivery
  // ---------------------------------------------------------------------------

  /// Routes `signal` to `to`, wherever it lives.
  pub(crate) fn deliver(&self, to: ProcessId, signal: Signal) {
    if to.node() == self.id {
      self.deliver_local(to, signal);
    } else if to.node().name() == self.id.name() {
      // An earlier incarnation of this node.
      self.bounce(to, signal, &Exit::NoProc);
    } else {
      self.send_dist(to.node().name(), DistMessage::Signal { to, signal });
    }
  }

  fn deliver_local(&self, to: ProcessId, signal: Signal) {
    let Some(proc) = self.find(to) else {
      return self.bounce(to, signal, &Exit::NoProc);
    };

    if let Err(signal) = proc.readonly.send.send(signal) {
      let exit: Exit = proc.exit_reason().unwrap_or(Exit::NoProc);
      self.bounce(to, signal, &exit);
    }
  }

  fn bounce(&self, to: ProcessId, signal: Signal, exit: &Exit) {
    if let Some((from, reply)) = signal.bounce(to, exit) {
      self.deliver(from, reply);
    }
  }

  /// Routes a value to the remote channel `id`.
  pub(crate) fn send_chan(&self, id: ChannelId, term: Term) {
    if id.node() == self.id {
      self.push_chan(id, term);
    } else {
      self.send_dist(id.node().name(), DistMessage::Chan { id, term });
    }
  }

  fn push_chan(&self, id: ChannelId, term: Term) {
    let sink: Option<Arc<dyn ChanSink>> = self.channels.lock().get(&id.index()).cloned();

    match sink {
      Some(sink) => sink.push_term(term),
      None => tracing::trace!(chan = %id, reason = "closed", "Chan Drop"),
    }
  }

  // ---------------------------------------------------------------------------
  // Distribution
  // ---------------------------------------------------------------------------

  /// Queues `message` on the connection to `node`, connecting if needed.
  ///
  /// Messages queued while connecting are sent once the handshake
  /// completes; they are lost if it fails.
  pub(crate) fn send_dist(&self, node: NodeName, message: DistMessage) {
    if self.token.is_cancelled() {
      tracing::trace!(%node, kind = message.kind(), reason = "shutdown", "Dist Drop");
      return;
    }

    let mut peers: _ = self.peers.lock();
    let peer: &mut Peer = peers.entry(node).or_insert_with(|| self.start_peer(node));

    if let Err(error) = peer.send.send(message) {
      tracing::trace!(%node, kind = error.0.kind(), reason = "closed", "Dist Drop");
    }
  }

  /// Returns the state of the connection to `node`, connecting if needed.
  pub(crate) fn ensure_peer(&self, node: NodeName) -> watch::Receiver<PeerState> {
    let mut peers: _ = self.peers.lock();

    peers
      .entry(node)
      .or_insert_with(|| self.start_peer(node))
      .state
      .clone()
  }

  // Called with the peer table locked.
  fn start_peer(&self, node: NodeName) -> Peer {
    let serial: u64 = self.next_peer.fetch_add(1, Ordering::Relaxed);

    let (send, queue): (UnboundedSender<DistMessage>, UnboundedReceiver<DistMessage>) = mpsc::unbounded_channel();
    let (state_tx, state): (watch::Sender<PeerState>, watch::Receiver<PeerState>) =
      watch::channel(PeerState::Connecting);

    tracing::debug!(%node, serial, "Dist Connect");

    drop(self.runtime.spawn(peer::run_outbound(
      self.weak.clone(),
      node,
      serial,
      queue,
      state_tx,
    )));

    Peer { serial, send, state }
  }

  /// Applies a message received from `remote`.
  pub(crate) fn dispatch(self: &Arc<Self>, remote: NodeId, message: DistMessage) {
    let _guard: EnterGuard = self.enter();

    tracing::trace!(from = %remote, kind = message.kind(), "Dist Recv");

    match message {
      DistMessage::Signal { to, signal } if to.node().name() == self.id.name() => {
        self.deliver(to, signal);
      }
      DistMessage::Signal { to, .. } => {
        tracing::warn!(from = %remote, %to, reason = "misrouted", "Dist Drop");
      }
      DistMessage::Chan { id, term } if id.node() == self.id => {
        self.push_chan(id, term);
      }
      DistMessage::Chan { id, .. } => {
        tracing::trace!(chan = %id, reason = "stale", "Chan Drop");
      }
      DistMessage::NamedSend { name, from, term } => {
        bifs::proc_send_named(self, from, &name, term);
      }
      DistMessage::Spawn { sref, name, args } => {
        let result: Result<ProcessId, SpawnError> = self.spawn_entry(&name, args);
        self.send_dist(remote.name(), DistMessage::SpawnReply(SpawnReply { sref, result }));
      }
      DistMessage::SpawnReply(reply) => {
        if let Some(pending) = self.spawns.lock().remove(&reply.sref) {
          let _ignore: Result<(), _> = pending.reply.send(reply.result);
        }
      }
      DistMessage::Hello { .. } | DistMessage::Welcome { .. } => {
        tracing::warn!(from = %remote, reason = "handshake after connect", "Dist Drop");
      }
    }
  }

  /// Spawns the remote table entry `name` on this node.
  pub(crate) fn spawn_entry(self: &Arc<Self>, name: &str, args: Term) -> Result<ProcessId, SpawnError> {
    let Some(entry) = self.remote.get(name) else {
      return Err(SpawnError::NotRegistered(name.to_owned()));
    };

    let future: _ = entry(args)?;

    match bifs::proc_spawn(self, None, SpawnConfig::new(), future) {
      Ok(handle) => Ok(handle.pid()),
      Err(_) => Err(SpawnError::SystemLimit),
    }
  }

  /// Spawns the remote table entry `name` on `node`.
  pub(crate) async fn spawn_remote(
    self: &Arc<Self>,
    node: NodeName,
    name: &str,
    args: Term,
  ) -> Result<ProcessId, SpawnError> {
    if node == self.id.name() {
      let _guard: EnterGuard = self.enter();
      return self.spawn_entry(name, args);
    }

    if self.token.is_cancelled() {
      return Err(SpawnError::Disconnected);
    }

    let sref: MonitorRef = self.make_ref();
    let (reply, wait): (oneshot::Sender<_>, oneshot::Receiver<_>) = oneshot::channel();

    self.spawns.lock().insert(sref, PendingSpawn { node, reply });

    self.send_dist(
      node,
      DistMessage::Spawn {
        sref,
        name: name.to_owned(),
        args,
      },
    );

    match time::timeout(self.config.spawn_timeout, wait).await {
      Ok(Ok(result)) => result,
      Ok(Err(_)) => Err(SpawnError::Disconnected),
      Err(_) => {
        self.spawns.lock().remove(&sref);
        Err(SpawnError::Timeout)
      }
    }
  }

  /// Fires every relationship towards `node` after its connection failed.
  pub(crate) fn peer_down(&self, node: NodeName, serial: u64, reason: &PeerDown) {
    {
      let mut peers: _ = self.peers.lock();

      if peers.get(&node).is_some_and(|peer| peer.serial == serial) {
        peers.remove(&node);
      }
    }

    let watches: Vec<Watch> = self.watches.take(node);

    tracing::debug!(%node, %reason, watches = watches.len(), "Dist Down");

    for watch in watches {
      match watch {
        Watch::Link { origin, target } => {
          self.deliver(origin, SignalLinkExit::new(target, Exit::Disconnected).into());
        }
        Watch::Monitor { origin, target, mref } => {
          self.deliver(origin, SignalMonitorDown::new(target, mref, Exit::Disconnected).into());
        }
        Watch::Node { origin, mref } => {
          self.deliver(origin, SignalNodeDown::new(node, mref).into());
        }
      }
    }

    // Dropping the reply senders fails the waiting spawns.
    self.spawns.lock().retain(|_, pending| pending.node != node);
  }
}

impl Debug for NodeInner {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("NodeInner")
      .field("id", &self.id)
      .field("procs", &self.procs.len())
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Enter Guard
// -----------------------------------------------------------------------------

/// Restores the previously [`current`] node on drop.
///
/// [`current`]: NodeInner::current
pub(crate) struct EnterGuard {
  prev: Option<NodeWeak>,
}

impl Drop for EnterGuard {
  fn drop(&mut self) {
    let prev: Option<NodeWeak> = self.prev.take();
    CURRENT.with(|current| *current.borrow_mut() = prev);
  }
}
