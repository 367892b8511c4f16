use async_trait::async_trait;
use bytes::Bytes;
use bytes::BytesMut;
use futures::SinkExt;
use futures::StreamExt;
use std::io;
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio_util::codec::FramedRead;
use tokio_util::codec::FramedWrite;
use tokio_util::codec::LengthDelimitedCodec;
use tokio_util::sync::CancellationToken;

use crate::consts::MAX_FRAME_BYTES;
use crate::dist::Connection;
use crate::dist::Endpoint;
use crate::dist::FrameSink;
use crate::dist::FrameStream;
use crate::dist::Transport;
use crate::dist::TransportError;

// -----------------------------------------------------------------------------
// Tcp Transport
// -----------------------------------------------------------------------------

/// Transport over TCP with length-delimited frames.
///
/// Addresses are socket addresses; binding port `0` picks a free port, and
/// the endpoint reports the address it was actually bound to. Frames larger
/// than [`MAX_FRAME_BYTES`] are rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpTransport;

impl TcpTransport {
  /// Creates a new TCP transport.
  #[inline]
  pub const fn new() -> Self {
    Self
  }
}

#[async_trait]
impl Transport for TcpTransport {
  async fn bind(&self, address: &str) -> Result<Box<dyn Endpoint>, TransportError> {
    let address: SocketAddr = address.parse().map_err(|_| TransportError::InvalidAddress)?;
    let listener: TcpListener = TcpListener::bind(address).await.map_err(map_error)?;
    let local: SocketAddr = listener.local_addr()?;

    tracing::debug!(address = %local, "Tcp Bind");

    Ok(Box::new(TcpEndpoint {
      address: local.to_string(),
      listener,
      token: CancellationToken::new(),
    }))
  }

  async fn connect(&self, address: &str) -> Result<Connection, TransportError> {
    let address: SocketAddr = address.parse().map_err(|_| TransportError::InvalidAddress)?;
    let stream: TcpStream = TcpStream::connect(address).await.map_err(map_error)?;

    framed(stream)
  }
}

// -----------------------------------------------------------------------------
// Tcp Endpoint
// -----------------------------------------------------------------------------

struct TcpEndpoint {
  address: String,
  listener: TcpListener,
  token: CancellationToken,
}

#[async_trait]
impl Endpoint for TcpEndpoint {
  fn address(&self) -> &str {
    &self.address
  }

  async fn accept(&self) -> Result<Connection, TransportError> {
    tokio::select! {
      () = self.token.cancelled() => Err(TransportError::Closed),
      result = self.listener.accept() => {
        let (stream, peer): (TcpStream, SocketAddr) = result?;
        tracing::trace!(%peer, "Tcp Accept");
        framed(stream)
      }
    }
  }

  // Connections are owned by the node and close when it drops them.
  fn close(&self) {
    self.token.cancel();
  }
}

// -----------------------------------------------------------------------------
// Tcp Connection
// -----------------------------------------------------------------------------

struct TcpSink {
  inner: FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
}

#[async_trait]
impl FrameSink for TcpSink {
  async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
    self.inner.send(frame).await.map_err(TransportError::Io)
  }
}

struct TcpFrames {
  inner: FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
}

#[async_trait]
impl FrameStream for TcpFrames {
  async fn recv(&mut self) -> Option<Bytes> {
    match self.inner.next().await {
      Some(Ok(frame)) => Some(BytesMut::freeze(frame)),
      Some(Err(error)) => {
        tracing::warn!(%error, "Tcp Frame");
        None
      }
      None => None,
    }
  }
}

fn codec() -> LengthDelimitedCodec {
  LengthDelimitedCodec::builder()
    .max_frame_length(MAX_FRAME_BYTES)
    .new_codec()
}

fn framed(stream: TcpStream) -> Result<Connection, TransportError> {
  stream.set_nodelay(true)?;

  let (read, write): (OwnedReadHalf, OwnedWriteHalf) = stream.into_split();

  Ok(Connection::new(
    TcpSink {
      inner: FramedWrite::new(write, codec()),
    },
    TcpFrames {
      inner: FramedRead::new(read, codec()),
    },
  ))
}

fn map_error(error: io::Error) -> TransportError {
  match error.kind() {
    ErrorKind::AddrInUse => TransportError::AddrInUse,
    ErrorKind::ConnectionRefused => TransportError::Unreachable,
    ErrorKind::AddrNotAvailable => TransportError::InvalidAddress,
    _ => TransportError::Io(error),
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use bytes::Bytes;

  use crate::dist::Connection;
  use crate::dist::Endpoint;
  use crate::dist::TcpTransport;
  use crate::dist::Transport;
  use crate::dist::TransportError;

  #[tokio::test]
  async fn test_frames_keep_boundaries() {
    let transport: TcpTransport = TcpTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("127.0.0.1:0").await.unwrap();

    let mut client: Connection = transport.connect(endpoint.address()).await.unwrap();
    let mut server: Connection = endpoint.accept().await.unwrap();

    client.sink.send(Bytes::from_static(b"first")).await.unwrap();
    client.sink.send(Bytes::from_static(b"")).await.unwrap();
    client.sink.send(Bytes::from_static(b"third")).await.unwrap();

    assert_eq!(server.stream.recv().await.unwrap().as_ref(), b"first");
    assert_eq!(server.stream.recv().await.unwrap().as_ref(), b"");
    assert_eq!(server.stream.recv().await.unwrap().as_ref(), b"third");
  }

  #[tokio::test]
  async fn test_drop_ends_stream() {
    let transport: TcpTransport = TcpTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("127.0.0.1:0").await.unwrap();

    let client: Connection = transport.connect(endpoint.address()).await.unwrap();
    let mut server: Connection = endpoint.accept().await.unwrap();

    drop(client);

    assert!(server.stream.recv().await.is_none());
  }

  #[tokio::test]
  async fn test_addr_in_use() {
    let transport: TcpTransport = TcpTransport::new();
    let endpoint: Box<dyn Endpoint> = transport.bind("127.0.0.1:0").await.unwrap();

    assert!(matches!(transport.bind(endpoint.address()).await, Err(TransportError::AddrInUse)));
  }

  #[tokio::test]
  async fn test_invalid_address() {
    let transport: TcpTransport = TcpTransport::new();
    assert!(matches!(transport.bind("not an address").await, Err(TransportError::InvalidAddress)));
  }
}
