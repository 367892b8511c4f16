use async_trait::async_trait;
use bytes::Bytes;

use crate::dist::TransportError;

// -----------------------------------------------------------------------------
// Transport
// -----------------------------------------------------------------------------

/// Factory for endpoints and outgoing connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
  /// Binds a new endpoint to `address`.
  ///
  /// The endpoint's [`address`] may differ from the requested one, for
  /// example when the transport picks a port.
  ///
  /// [`address`]: Endpoint::address
  async fn bind(&self, address: &str) -> Result<Box<dyn Endpoint>, TransportError>;

  /// Opens a connection to the endpoint bound to `address`.
  async fn connect(&self, address: &str) -> Result<Connection, TransportError>;
}

// -----------------------------------------------------------------------------
// Endpoint
// -----------------------------------------------------------------------------

/// A bound address accepting incoming connections.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
  /// Returns the address other nodes use to reach this endpoint.
  fn address(&self) -> &str;

  /// Waits for the next incoming connection.
  ///
  /// Returns [`TransportError::Closed`] once the endpoint is closed.
  async fn accept(&self) -> Result<Connection, TransportError>;

  /// Closes the endpoint and every connection it accepted or opened.
  fn close(&self);
}

// -----------------------------------------------------------------------------
// Frames
// -----------------------------------------------------------------------------

/// Sending half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
  /// Sends one frame. Frames are delivered in order or not at all.
  async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;
}

/// Receiving half of a connection.
#[async_trait]
pub trait FrameStream: Send + 'static {
  /// Returns the next frame, or `None` once the connection is lost.
  async fn recv(&mut self) -> Option<Bytes>;
}

/// An established connection.
pub struct Connection {
  pub sink: Box<dyn FrameSink>,
  pub stream: Box<dyn FrameStream>,
}

impl Connection {
  /// Creates a connection from its halves.
  #[inline]
  pub fn new<S, R>(sink: S, stream: R) -> Self
  where
    S: FrameSink,
    R: FrameStream,
  {
    Self {
      sink: Box::new(sink),
      stream: Box::new(stream),
    }
  }
}
