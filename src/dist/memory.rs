use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::dist::Connection;
use crate::dist::Endpoint;
use crate::dist::FrameSink;
use crate::dist::FrameStream;
use crate::dist::Transport;
use crate::dist::TransportError;

type Hub = Arc<Mutex<HashMap<String, Listener>>>;

struct Listener {
  accept: UnboundedSender<Connection>,
  token: CancellationToken,
}

// -----------------------------------------------------------------------------
// Memory Transport
// -----------------------------------------------------------------------------

/// In-process transport connecting nodes through a shared hub.
///
/// Addresses are arbitrary strings. Every clone of a transport shares one
/// hub, so nodes created from clones can reach each other. Closing an
/// endpoint severs every connection it took part in, which the peers
/// observe as connection loss.
///
/// # Examples
///
/// ```no_run
/// use tarazed::dist::MemoryTransport;
/// use tarazed::node::Node;
/// use tarazed::node::RemoteTable;
///
/// # async fn run() -> Result<(), tarazed::node::NodeError> {
/// let transport: MemoryTransport = MemoryTransport::new();
///
/// let a: Node = Node::create(transport.clone(), "a", RemoteTable::new()).await?;
/// let b: Node = Node::create(transport.clone(), "b", RemoteTable::new()).await?;
///
/// a.connect("b").await?;
/// # drop(b);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryTransport {
  hub: Hub,
}

impl MemoryTransport {
  /// Creates a transport with an empty hub.
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Transport for MemoryTransport {
  async fn bind(&self, address: &str) -> Result<Box<dyn Endpoint>, TransportError> {
    if address.is_empty() {
      return Err(TransportError::InvalidAddress);
    }

    let mut hub: _ = self.hub.lock();

    if hub.get(address).is_some_and(|listener| !listener.token.is_cancelled()) {
      return Err(TransportError::AddrInUse);
    }

    let (accept, queue): (UnboundedSender<Connection>, UnboundedReceiver<Connection>) = mpsc::unbounded_channel();
    let token: CancellationToken = CancellationToken::new();

    hub.insert(
      address.to_owned(),
      Listener {
        accept,
        token: token.clone(),
      },
    );

    Ok(Box::new(MemoryEndpoint {
      address: address.to_owned(),
      queue: tokio::sync::Mutex::new(queue),
      token,
      hub: Arc::clone(&self.hub),
    }))
  }

  async fn connect(&self, address: &str) -> Result<Connection, TransportError> {
    let hub: _ = self.hub.lock();

    let Some(listener) = hub.get(address).filter(|listener| !listener.token.is_cancelled()) else {
      return Err(TransportError::Unreachable);
    };

    let (local, remote): (Connection, Connection) = pair(&listener.token);

    listener
      .accept
      .send(remote)
      .map_err(|_| TransportError::Unreachable)?;

    Ok(local)
  }
}

// -----------------------------------------------------------------------------
// Memory Endpoint
// -----------------------------------------------------------------------------

struct MemoryEndpoint {
  address: String,
  queue: tokio::sync::Mutex<UnboundedReceiver<Connection>>,
  token: CancellationToken,
  hub: Hub,
}

#[async_trait]
impl Endpoint for MemoryEndpoint {
  fn address(&self) -> &str {
    &self.address
  }

  async fn accept(&self) -> Result<Connection, TransportError> {
    let mut queue: _ = self.queue.lock().await;

    tokio::select! {
      () = self.token.cancelled() => Err(TransportError::Closed),
      conn = queue.recv() => conn.ok_or(TransportError::Closed),
    }
  }

  fn close(&self) {
    self.token.cancel();
    self.hub.lock().retain(|_, listener| !listener.token.is_cancelled());
  }
}

// -----------------------------------------------------------------------------
// Memory Connection
// -----------------------------------------------------------------------------

struct MemorySink {
  send: UnboundedSender<Bytes>,
  token: CancellationToken,
}

#[async_trait]
impl FrameSink for MemorySink {
  async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
    if self.token.is_cancelled() {
      return Err(TransportError::Closed);
    }

    self.send.send(frame).map_err(|_| TransportError::Closed)
  }
}

struct MemoryStream {
  recv: UnboundedReceiver<Bytes>,
  token: CancellationToken,
}

#[async_trait]
impl FrameStream for MemoryStream {
  async fn recv(&mut self) -> Option<Bytes> {
    tokio::select! {
      () = self.token.cancelled() => None,
      frame = self.recv.recv() => frame,
    }
  }
}

// Both connection halves are severed when the accepting endpoint closes.
// A dialing node closing its endpoint drops its halves instead.
fn pair(token: &CancellationToken) -> (Connection, Connection) {
  let (a_send, a_recv): (UnboundedSender<Bytes>, UnboundedReceiver<Bytes>) = mpsc::unbounded_channel();
  let (b_send, b_recv): (UnboundedSender<Bytes>, UnboundedReceiver<Bytes>) = mpsc::unbounded_channel();

  let local: Connection = Connection::new(
    MemorySink {
      send: a_send,
      token: token.clone(),
    },
    MemoryStream {
      recv: b_recv,
      token: token.clone(),
    },
  );

  let remote: Connection = Connection::new(
    MemorySink {
      send: b_send,
      token: token.clone(),
    },
    MemoryStream {
      recv: a_recv,
      token: token.clone(),
    },
  );

  (local, remote)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use bytes::Bytes;

  use crate::dist::Connection;
  use crate::dist::Endpoint;
  use crate::dist::MemoryTransport;
  use crate::dist::Transport;
  use crate::dist::TransportError;

  #[tokio::test]
  async fn test_frames_in_order() {
    let transport: MemoryTransport = MemoryTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("mem-order").await.unwrap();

    let mut client: Connection = transport.connect("mem-order").await.unwrap();
    let mut server: Connection = endpoint.accept().await.unwrap();

    for index in 0..3_u8 {
      client.sink.send(Bytes::from(vec![index])).await.unwrap();
    }

    for index in 0..3_u8 {
      assert_eq!(server.stream.recv().await.unwrap().as_ref(), &[index]);
    }

    server.sink.send(Bytes::from_static(b"ack")).await.unwrap();
    assert_eq!(client.stream.recv().await.unwrap().as_ref(), b"ack");
  }

  #[tokio::test]
  async fn test_addr_in_use() {
    let transport: MemoryTransport = MemoryTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("mem-busy").await.unwrap();

    assert!(matches!(transport.bind("mem-busy").await, Err(TransportError::AddrInUse)));

    endpoint.close();

    assert!(transport.bind("mem-busy").await.is_ok());
  }

  #[tokio::test]
  async fn test_unreachable() {
    let transport: MemoryTransport = MemoryTransport::new();
    assert!(matches!(transport.connect("mem-nobody").await, Err(TransportError::Unreachable)));
  }

  #[tokio::test]
  async fn test_close_severs_connections() {
    let transport: MemoryTransport = MemoryTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("mem-close").await.unwrap();

    let mut client: Connection = transport.connect("mem-close").await.unwrap();
    let mut server: Connection = endpoint.accept().await.unwrap();

    endpoint.close();

    assert!(client.stream.recv().await.is_none());
    assert!(server.stream.recv().await.is_none());
    assert!(matches!(client.sink.send(Bytes::new()).await, Err(TransportError::Closed)));
    assert!(matches!(endpoint.accept().await, Err(TransportError::Closed)));
  }
}
