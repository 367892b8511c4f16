//! Typed point-to-point channels.
//!
//! A channel is a single-consumer queue with a cloneable, serializable
//! [`SendPort`] and an exclusively owned [`ReceivePort`]. Channel traffic
//! never enters a process mailbox; a process waits on both at once with
//! [`Match::port`].
//!
//! Every value pushed into any queue is stamped from one global sequence,
//! which lets a merged [`ReceivePort`] yield values in arrival order.
//!
//! [`Match::port`]: crate::erts::Match::port

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::time;
use tokio::time::Instant;

use crate::core::ChannelId;
use crate::core::Item;
use crate::core::Term;
use crate::node::NodeInner;
use crate::node::NodeWeak;

// Arrival order shared by every channel queue.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Table of the channel queues owned by a node, keyed by channel index.
pub(crate) type ChanTable = Mutex<HashMap<u64, Arc<dyn ChanSink>>>;

// -----------------------------------------------------------------------------
// Chan Sink
// -----------------------------------------------------------------------------

/// Type-erased view of a channel queue.
pub(crate) trait ChanSink: Send + Sync + 'static {
  /// Pushes a value received from another node.
  fn push_term(&self, term: Term);

  fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

// -----------------------------------------------------------------------------
// Chan Queue
// -----------------------------------------------------------------------------

pub(crate) struct ChanQueue<T> {
  items: Mutex<VecDeque<(u64, T)>>,
  notify: triomphe::Arc<Notify>,
}

impl<T> ChanQueue<T> {
  fn new() -> Self {
    Self {
      items: Mutex::new(VecDeque::new()),
      notify: triomphe::Arc::new(Notify::new()),
    }
  }

  fn push(&self, value: T) {
    let mut items: _ = self.items.lock();
    let sequence: u64 = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    items.push_back((sequence, value));
    drop(items);

    self.notify.notify_one();
  }

  fn front(&self) -> Option<u64> {
    self.items.lock().front().map(|(sequence, _)| *sequence)
  }

  fn pop(&self) -> Option<T> {
    self.items.lock().pop_front().map(|(_, value)| value)
  }
}

impl<T> ChanSink for ChanQueue<T>
where
  T: Item,
{
  fn push_term(&self, term: Term) {
    match term.downcast::<T>() {
      Ok(value) => self.push(value),
      Err(term) => tracing::debug!(
        expected = %std::any::type_name::<T>(),
        found = %term.type_name(),
        "Chan Decode",
      ),
    }
  }

  fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }
}

// -----------------------------------------------------------------------------
// Send Port
// -----------------------------------------------------------------------------

enum Route<T> {
  Local(Weak<ChanQueue<T>>),
  Remote(NodeWeak),
  Detached,
}

/// Sending side of a channel.
///
/// Send ports can be cloned and sent to other processes, local or remote.
/// A port deserialized outside of any node is detached and drops every
/// value sent to it.
pub struct SendPort<T> {
  id: ChannelId,
  route: Route<T>,
}

impl<T> SendPort<T>
where
  T: Item,
{
  /// Returns the identifier of the channel.
  #[inline]
  pub const fn id(&self) -> ChannelId {
    self.id
  }

  /// Sends `value` into the channel.
  ///
  /// Never blocks and never fails. The value is dropped if the receive port
  /// is gone or its node cannot be reached.
  pub fn send(&self, value: T) {
    match self.route {
      Route::Local(ref queue) => match queue.upgrade() {
        Some(queue) => queue.push(value),
        None => tracing::trace!(chan = %self.id, reason = "closed", "Chan Drop"),
      },
      Route::Remote(ref node) => match node.upgrade() {
        Some(node) => node.send_chan(self.id, Term::new(value)),
        None => tracing::trace!(chan = %self.id, reason = "node down", "Chan Drop"),
      },
      Route::Detached => {
        tracing::debug!(chan = %self.id, reason = "detached", "Chan Drop");
      }
    }
  }

  fn bind(id: ChannelId, node: &NodeInner) -> Self {
    if id.node() != node.id {
      let route: Route<T> = if id.node().name() == node.id.name() {
        Route::Detached
      } else {
        Route::Remote(node.weak.clone())
      };

      return Self { id, route };
    }

    let sink: Option<Arc<dyn ChanSink>> = node.channels.lock().get(&id.index()).cloned();

    let route: Route<T> = match sink.map(|sink| sink.as_any().downcast::<ChanQueue<T>>()) {
      Some(Ok(queue)) => Route::Local(Arc::downgrade(&queue)),
      Some(Err(_)) | None => Route::Detached,
    };

    Self { id, route }
  }
}

impl<T> Clone for SendPort<T> {
  fn clone(&self) -> Self {
    let route: Route<T> = match self.route {
      Route::Local(ref queue) => Route::Local(Weak::clone(queue)),
      Route::Remote(ref node) => Route::Remote(Weak::clone(node)),
      Route::Detached => Route::Detached,
    };

    Self { id: self.id, route }
  }
}

impl<T> Debug for SendPort<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "SendPort({})", self.id)
  }
}

impl<T> PartialEq for SendPort<T> {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl<T> Serialize for SendPort<T> {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self.id.serialize(serializer)
  }
}

impl<'de, T> Deserialize<'de> for SendPort<T>
where
  T: Item,
{
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let id: ChannelId = ChannelId::deserialize(deserializer)?;

    match NodeInner::current() {
      Some(node) => Ok(Self::bind(id, &node)),
      None => Ok(Self {
        id,
        route: Route::Detached,
      }),
    }
  }
}

// -----------------------------------------------------------------------------
// Receive Port
// -----------------------------------------------------------------------------

struct PortInput<T> {
  queue: Arc<ChanQueue<T>>,
  node: NodeWeak,
  index: u64,
}

impl<T> Drop for PortInput<T> {
  fn drop(&mut self) {
    if let Some(node) = self.node.upgrade() {
      node.channels.lock().remove(&self.index);
    }
  }
}

/// Receiving side of a channel.
///
/// Receive ports are exclusively owned. Dropping a port closes every
/// channel it reads from.
pub struct ReceivePort<T> {
  inputs: Vec<PortInput<T>>,
}

impl<T> ReceivePort<T>
where
  T: Item,
{
  /// Removes and returns the oldest value, if any.
  pub fn try_recv(&mut self) -> Option<T> {
    let mut oldest: Option<(u64, usize)> = None;

    for (index, input) in self.inputs.iter().enumerate() {
      let Some(sequence) = input.queue.front() else {
        continue;
      };

      if oldest.is_none_or(|(current, _)| sequence < current) {
        oldest = Some((sequence, index));
      }
    }

    oldest.and_then(|(_, index)| self.inputs[index].queue.pop())
  }

  /// Waits for the next value.
  pub async fn recv(&mut self) -> T {
    loop {
      if let Some(value) = self.recv_inner(None).await {
        return value;
      }
    }
  }

  /// Waits for the next value, giving up after `timeout`.
  ///
  /// A zero timeout checks the port without waiting.
  pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<T> {
    self.recv_inner(Some(Instant::now() + timeout)).await
  }

  async fn recv_inner(&mut self, deadline: Option<Instant>) -> Option<T> {
    loop {
      let notify: Vec<triomphe::Arc<Notify>> = self.notifiers();
      let mut waits: Vec<Pin<Box<Notified<'_>>>> = notify.iter().map(|n| Box::pin(n.notified())).collect();

      for wait in waits.iter_mut() {
        wait.as_mut().enable();
      }

      if let Some(value) = self.try_recv() {
        return Some(value);
      }

      match deadline {
        Some(deadline) if deadline <= Instant::now() => return None,
        // A port without inputs never yields.
        Some(deadline) if waits.is_empty() => {
          time::sleep_until(deadline).await;
          return None;
        }
        None if waits.is_empty() => futures::future::pending::<()>().await,
        Some(deadline) => {
          if time::timeout_at(deadline, futures::future::select_all(waits)).await.is_err() {
            return None;
          }
        }
        None => {
          futures::future::select_all(waits).await;
        }
      }
    }
  }

  pub(crate) fn notifiers(&self) -> Vec<triomphe::Arc<Notify>> {
    self
      .inputs
      .iter()
      .map(|input| triomphe::Arc::clone(&input.queue.notify))
      .collect()
  }
}

impl<T> Debug for ReceivePort<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("ReceivePort")
      .field("inputs", &self.inputs.len())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Misc. Utilities
// -----------------------------------------------------------------------------

/// Creates a channel owned by `node`.
pub(crate) fn new_channel<T>(node: &NodeInner) -> (SendPort<T>, ReceivePort<T>)
where
  T: Item,
{
  let index: u64 = node.next_chan.fetch_add(1, Ordering::Relaxed);
  let queue: Arc<ChanQueue<T>> = Arc::new(ChanQueue::new());

  node
    .channels
    .lock()
    .insert(index, Arc::clone(&queue) as Arc<dyn ChanSink>);

  let id: ChannelId = ChannelId::new(node.id, index);

  let send: SendPort<T> = SendPort {
    id,
    route: Route::Local(Arc::downgrade(&queue)),
  };

  let recv: ReceivePort<T> = ReceivePort {
    inputs: vec![PortInput {
      queue,
      node: node.weak.clone(),
      index,
    }],
  };

  (send, recv)
}

/// Combines `ports` into one receive port.
///
/// The merged port yields values in the order they arrived, across all of
/// its inputs.
pub fn merge_ports<T, I>(ports: I) -> ReceivePort<T>
where
  I: IntoIterator<Item = ReceivePort<T>>,
{
  let mut inputs: Vec<PortInput<T>> = Vec::new();

  for mut port in ports {
    inputs.append(&mut port.inputs);
  }

  ReceivePort { inputs }
}
