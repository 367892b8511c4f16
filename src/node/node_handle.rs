use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::pin::Pin;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::futures::Notified;
use tokio::sync::watch;
use tokio::time;

use crate::bifs;
use crate::consts::SHUTDOWN_TIMEOUT;
use crate::core::Exit;
use crate::core::Item;
use crate::core::NodeId;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Term;
use crate::dist::Endpoint;
use crate::dist::Transport;
use crate::erts::ProcessInfo;
use crate::erts::ReceivePort;
use crate::erts::SendPort;
use crate::erts::SpawnConfig;
use crate::erts::SpawnError;
use crate::erts::SpawnHandle;
use crate::erts::new_channel;
use crate::node::NodeConfig;
use crate::node::NodeError;
use crate::node::NodeInner;
use crate::node::NodeRef;
use crate::node::NodeWeak;
use crate::node::RemoteTable;
use crate::node::peer;
use crate::node::peer::PeerDown;
use crate::node::peer::PeerState;
use crate::raise;

// -----------------------------------------------------------------------------
// Resolved
// -----------------------------------------------------------------------------

/// Where a [`ProcessId`] lives, as seen from one node.
#[derive(Clone, Debug)]
pub enum Resolved {
  /// The process belongs to this node incarnation.
  Local(MailboxRef),
  /// The process belongs to the node reachable at this address.
  Remote(NodeName),
}

/// Send handle for a process hosted by the resolving node.
#[derive(Clone, Debug)]
pub struct MailboxRef {
  pid: ProcessId,
  node: NodeWeak,
}

impl MailboxRef {
  /// Returns the process identifier.
  #[inline]
  pub const fn pid(&self) -> ProcessId {
    self.pid
  }

  /// Enqueues `message` without a sender. Never blocks and never fails.
  pub fn send<T>(&self, message: T)
  where
    T: Item,
  {
    if let Some(node) = self.node.upgrade() {
      bifs::proc_send(&node, None, self.pid, Term::new(message));
    }
  }
}

// -----------------------------------------------------------------------------
// Node
// -----------------------------------------------------------------------------

/// Handle to a running node.
///
/// A node hosts local processes and bridges to its transport for everything
/// else. Handles are cheap to clone; the node keeps running until
/// [`shutdown`] is called, even if every handle is dropped.
///
/// # Examples
///
/// ```no_run
/// use tarazed::dist::MemoryTransport;
/// use tarazed::erts::Process;
/// use tarazed::node::Node;
/// use tarazed::node::RemoteTable;
///
/// # async fn run() -> Result<(), tarazed::node::NodeError> {
/// let node: Node = Node::create(MemoryTransport::new(), "main", RemoteTable::new()).await?;
///
/// let pid = node.spawn(async {
///   let name: String = Process::receive().await;
///   println!("hello, {name}");
/// });
///
/// node.send(pid, String::from("world"));
/// # Ok(())
/// # }
/// ```
///
/// [`shutdown`]: Self::shutdown
#[derive(Clone)]
pub struct Node {
  inner: NodeRef,
}

impl Node {
  #[inline]
  pub(crate) const fn from_inner(inner: NodeRef) -> Self {
    Self { inner }
  }

  /// Creates a node bound to `address` with the default configuration.
  ///
  /// # Errors
  ///
  /// Returns [`NodeError::TransportBind`] if the endpoint cannot be bound.
  #[inline]
  pub async fn create<T>(transport: T, address: &str, remote: RemoteTable) -> Result<Self, NodeError>
  where
    T: Transport,
  {
    Self::create_opt(transport, address, remote, NodeConfig::new()).await
  }

  /// Creates a node bound to `address`.
  ///
  /// Must be called from within a tokio runtime; the node spawns its tasks
  /// onto that runtime. The node is named after the address the endpoint
  /// reports, which other nodes use to reach it.
  ///
  /// # Errors
  ///
  /// Returns [`NodeError::TransportBind`] if the endpoint cannot be bound.
  pub async fn create_opt<T>(
    transport: T,
    address: &str,
    remote: RemoteTable,
    config: NodeConfig,
  ) -> Result<Self, NodeError>
  where
    T: Transport,
  {
    let transport: Arc<dyn Transport> = Arc::new(transport);

    let endpoint: Arc<dyn Endpoint> = match transport.bind(address).await {
      Ok(endpoint) => Arc::from(endpoint),
      Err(source) => {
        return Err(NodeError::TransportBind {
          address: address.to_owned(),
          source,
        });
      }
    };

    let name: NodeName = match NodeName::try_new(endpoint.address()) {
      Ok(name) => name,
      Err(source) => {
        endpoint.close();
        return Err(NodeError::InvalidName {
          address: endpoint.address().to_owned(),
          source,
        });
      }
    };

    let id: NodeId = NodeId::fresh(name);
    let timeout: Duration = config.connect_timeout;
    let runtime: Handle = Handle::current();

    let inner: NodeRef = Arc::new_cyclic(|weak| {
      NodeInner::new(
        NodeWeak::clone(weak),
        id,
        config,
        remote,
        transport,
        Arc::clone(&endpoint),
        runtime.clone(),
      )
    });

    drop(runtime.spawn(peer::run_acceptor(
      Arc::downgrade(&inner),
      endpoint,
      inner.token.clone(),
      timeout,
    )));

    tracing::debug!(node = %id, "Node Start");

    Ok(Self { inner })
  }

  // ---------------------------------------------------------------------------
  // General API
  // ---------------------------------------------------------------------------

  /// Returns the identity of this node incarnation.
  #[inline]
  pub fn id(&self) -> NodeId {
    self.inner.id
  }

  /// Returns the node name.
  #[inline]
  pub fn name(&self) -> NodeName {
    self.inner.id.name()
  }

  /// Returns the address the endpoint is bound to.
  #[inline]
  pub fn address(&self) -> &str {
    self.inner.endpoint.address()
  }

  /// Returns the node configuration.
  #[inline]
  pub fn config(&self) -> &NodeConfig {
    &self.inner.config
  }

  /// Returns `true` once [`shutdown`] has been called.
  ///
  /// [`shutdown`]: Self::shutdown
  #[inline]
  pub fn is_shutdown(&self) -> bool {
    self.inner.token.is_cancelled()
  }

  /// Classifies `pid` as hosted by this node or by another one.
  ///
  /// Identifiers from an earlier incarnation of this node resolve as remote
  /// to this node's own name; sends to them are dropped.
  pub fn resolve(&self, pid: ProcessId) -> Resolved {
    if pid.node() == self.inner.id {
      Resolved::Local(MailboxRef {
        pid,
        node: self.inner.weak.clone(),
      })
    } else {
      Resolved::Remote(pid.node().name())
    }
  }

  // ---------------------------------------------------------------------------
  // Processes
  // ---------------------------------------------------------------------------

  /// Spawns a new process to handle `future`.
  ///
  /// # Errors
  ///
  /// Raises [`Exception`] if the process table is full.
  ///
  /// [`Exception`]: crate::error::Exception
  pub fn spawn<F>(&self, future: F) -> ProcessId
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self.spawn_opt(future, SpawnConfig::new()).pid()
  }

  /// Spawns a new process with the given `opts` to handle `future`.
  ///
  /// # Errors
  ///
  /// Raises [`Exception`] if `opts` requests a link or monitor, which need
  /// a parent process, or if the process table is full.
  ///
  /// [`Exception`]: crate::error::Exception
  pub fn spawn_opt<F>(&self, future: F, opts: SpawnConfig) -> SpawnHandle
  where
    F: Future<Output = ()> + Send + 'static,
  {
    if opts.link || opts.monitor {
      raise!(Error, BadArg, "link or monitor requires a parent process");
    }

    match bifs::proc_spawn(&self.inner, None, opts, future) {
      Ok(handle) => handle,
      Err(error) => raise!(Error, SysCap, error),
    }
  }

  /// Spawns the entry `name` of the remote table of `node` with `args`.
  ///
  /// # Errors
  ///
  /// Returns [`SpawnError`] if the entry is unknown or rejects `args`, or if
  /// `node` is unreachable or does not reply in time.
  pub async fn spawn_remote<T>(&self, node: impl Into<NodeName>, name: &str, args: T) -> Result<ProcessId, SpawnError>
  where
    T: Item,
  {
    self.inner.spawn_remote(node.into(), name, Term::new(args)).await
  }

  /// Sends `message` to `pid` with no sender.
  pub fn send<T>(&self, pid: ProcessId, message: T)
  where
    T: Item,
  {
    bifs::proc_send(&self.inner, None, pid, Term::new(message));
  }

  /// Sends `message` to the process registered as `name` on this node.
  pub fn send_named<T>(&self, name: &str, message: T)
  where
    T: Item,
  {
    bifs::proc_send_named(&self.inner, None, name, Term::new(message));
  }

  /// Sends a trappable exit signal with no sender to `pid`.
  pub fn exit(&self, pid: ProcessId, reason: impl Into<Exit>) {
    bifs::proc_exit(&self.inner, None, pid, reason.into());
  }

  /// Terminates `pid` with the given `reason`.
  pub fn kill(&self, pid: ProcessId, reason: impl Into<Exit>) {
    bifs::proc_kill(&self.inner, None, pid, reason.into());
  }

  /// Returns `true` if the local process `pid` exists and is not exiting.
  pub fn alive(&self, pid: ProcessId) -> bool {
    bifs::proc_alive(&self.inner, pid)
  }

  /// Returns information about the local process `pid`.
  pub fn info(&self, pid: ProcessId) -> Option<ProcessInfo> {
    bifs::proc_info(&self.inner, pid)
  }

  /// Returns the identifiers of all local processes, exiting ones included.
  pub fn processes(&self) -> Vec<ProcessId> {
    bifs::proc_list(&self.inner)
  }

  /// Returns the PID registered under `name`, if any.
  pub fn whereis(&self, name: &str) -> Option<ProcessId> {
    bifs::proc_whereis(&self.inner, name)
  }

  /// Returns every registered name.
  pub fn registered(&self) -> Vec<String> {
    bifs::proc_registered(&self.inner)
  }

  /// Creates a typed channel owned by this node.
  pub fn new_channel<T>(&self) -> (SendPort<T>, ReceivePort<T>)
  where
    T: Item,
  {
    new_channel(&self.inner)
  }

  // ---------------------------------------------------------------------------
  // Distribution
  // ---------------------------------------------------------------------------

  /// Establishes the connection to the node at `address`.
  ///
  /// Connections are otherwise opened on first use; an explicit connect
  /// surfaces failures that would only show up as `disconnected` events.
  ///
  /// # Errors
  ///
  /// Returns [`NodeError::Connect`] or [`NodeError::Handshake`] if the
  /// connection cannot be established.
  pub async fn connect(&self, address: &str) -> Result<NodeId, NodeError> {
    if self.is_shutdown() {
      return Err(NodeError::Shutdown);
    }

    let name: NodeName = NodeName::try_new(address).map_err(|source| NodeError::InvalidName {
      address: address.to_owned(),
      source,
    })?;

    if name == self.name() {
      return Ok(self.id());
    }

    let mut state: watch::Receiver<PeerState> = self.inner.ensure_peer(name);

    let result: Option<PeerState> = state
      .wait_for(|state| !matches!(state, PeerState::Connecting))
      .await
      .ok()
      .map(|state| state.clone());

    let reason: String = match result {
      Some(PeerState::Up(id)) => return Ok(id),
      Some(PeerState::Down(PeerDown::Handshake(reason))) => {
        return Err(NodeError::Handshake {
          address: address.to_owned(),
          reason,
        });
      }
      Some(PeerState::Down(PeerDown::Connect(reason))) => reason,
      Some(PeerState::Down(PeerDown::Lost) | PeerState::Connecting) | None => PeerDown::Lost.to_string(),
    };

    Err(NodeError::Connect {
      address: address.to_owned(),
      reason,
    })
  }

  /// Stops the node.
  ///
  /// Every local process is killed with [`Exit::Killed`], the endpoint is
  /// closed and every connection dropped. Other nodes observe this node as
  /// disconnected. Waits until the process table is empty.
  pub async fn shutdown(&self) {
    if self.inner.token.is_cancelled() {
      return;
    }

    tracing::debug!(node = %self.inner.id, procs = self.inner.procs.len(), "Node Stop");

    self.inner.token.cancel();

    for pid in bifs::proc_list(&self.inner) {
      bifs::proc_kill(&self.inner, None, pid, Exit::Killed);
    }

    self.inner.endpoint.close();
    self.inner.peers.lock().clear();
    self.inner.spawns.lock().clear();

    let drained: _ = time::timeout(SHUTDOWN_TIMEOUT, async {
      loop {
        let mut notified: Pin<&mut Notified<'_>> = pin!(self.inner.drained.notified());

        // Registered before the check so a removal in between is not missed.
        notified.as_mut().enable();

        if self.inner.procs.is_empty() {
          break;
        }

        notified.await;
      }
    });

    if drained.await.is_err() {
      tracing::warn!(node = %self.inner.id, procs = self.inner.procs.len(), "Node Stop Timeout");
    }
  }
}

impl Debug for Node {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Node").field("id", &self.inner.id).finish()
  }
}
