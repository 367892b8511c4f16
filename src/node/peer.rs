//! Connection management.
//!
//! Each node opens at most one outgoing connection per remote node and uses
//! it for everything it sends there. Incoming connections only carry
//! traffic towards this node. A lost outgoing connection is the only event
//! that fires remote links and monitors.

use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::core::NodeId;
use crate::core::NodeName;
use crate::dist::Connection;
use crate::dist::DistMessage;
use crate::dist::Endpoint;
use crate::dist::Transport;
use crate::dist::TransportError;
use crate::node::NodeWeak;

// -----------------------------------------------------------------------------
// Peer
// -----------------------------------------------------------------------------

/// Handle to the task owning the outgoing connection to one node.
pub(crate) struct Peer {
  pub(crate) serial: u64,
  pub(crate) send: UnboundedSender<DistMessage>,
  pub(crate) state: watch::Receiver<PeerState>,
}

/// Connection state published by the peer task.
#[derive(Clone, Debug)]
pub(crate) enum PeerState {
  Connecting,
  Up(NodeId),
  Down(PeerDown),
}

/// Why a connection went down.
#[derive(Clone, Debug)]
pub(crate) enum PeerDown {
  Connect(String),
  Handshake(String),
  Lost,
}

impl Display for PeerDown {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Connect(reason) => write!(f, "connect: {reason}"),
      Self::Handshake(reason) => write!(f, "handshake: {reason}"),
      Self::Lost => f.write_str("connection lost"),
    }
  }
}

// -----------------------------------------------------------------------------
// Outbound
// -----------------------------------------------------------------------------

/// Connects to `name` and forwards `queue` until the connection is lost.
pub(crate) async fn run_outbound(
  node: NodeWeak,
  name: NodeName,
  serial: u64,
  mut queue: UnboundedReceiver<DistMessage>,
  state: watch::Sender<PeerState>,
) {
  let Some(this) = node.upgrade() else {
    return;
  };

  let local: NodeId = this.id;
  let transport: Arc<dyn Transport> = Arc::clone(&this.transport);
  let timeout: Duration = this.config.connect_timeout;
  let token: CancellationToken = this.token.clone();

  drop(this);

  let span: tracing::Span = tracing::debug_span!("Dist Peer", node = %name, serial);

  async move {
    let result: Result<(Connection, NodeId), PeerDown> =
      match time::timeout(timeout, handshake(&*transport, name, local)).await {
        Ok(result) => result,
        Err(_) => Err(PeerDown::Connect(String::from("timed out"))),
      };

    let (mut conn, remote): (Connection, NodeId) = match result {
      Ok(result) => result,
      Err(reason) => {
        tracing::debug!(%reason, "Dist Fail");
        finish(&node, name, serial, reason, &state, &token);
        return;
      }
    };

    tracing::debug!(%remote, "Dist Up");
    state.send_replace(PeerState::Up(remote));

    let reason: PeerDown = loop {
      tokio::select! {
        biased;
        () = token.cancelled() => break PeerDown::Lost,
        message = queue.recv() => {
          let Some(message) = message else {
            break PeerDown::Lost;
          };

          match message.encode() {
            Ok(frame) => {
              if let Err(error) = conn.sink.send(frame).await {
                tracing::debug!(%error, "Dist Send");
                break PeerDown::Lost;
              }
            }
            Err(error) => {
              tracing::warn!(kind = message.kind(), %error, "Dist Drop");
            }
          }
        }
        frame = conn.stream.recv() => {
          if frame.is_none() {
            break PeerDown::Lost;
          }
        }
      }
    };

    finish(&node, name, serial, reason, &state, &token);
  }
  .instrument(span)
  .await
}

async fn handshake(transport: &dyn Transport, name: NodeName, local: NodeId) -> Result<(Connection, NodeId), PeerDown> {
  let mut conn: Connection = transport
    .connect(name.as_str())
    .await
    .map_err(|error| PeerDown::Connect(error.to_string()))?;

  let hello: bytes::Bytes = DistMessage::Hello { node: local }
    .encode()
    .map_err(|error| PeerDown::Handshake(error.to_string()))?;

  conn
    .sink
    .send(hello)
    .await
    .map_err(|error| PeerDown::Connect(error.to_string()))?;

  let Some(frame) = conn.stream.recv().await else {
    return Err(PeerDown::Handshake(String::from("closed before welcome")));
  };

  match DistMessage::decode(&frame) {
    Ok(DistMessage::Welcome { node }) if node.name() == name => Ok((conn, node)),
    Ok(DistMessage::Welcome { node }) => Err(PeerDown::Handshake(format!("answered as {node}"))),
    Ok(message) => Err(PeerDown::Handshake(format!("unexpected {}", message.kind()))),
    Err(error) => Err(PeerDown::Handshake(error.to_string())),
  }
}

fn finish(
  node: &NodeWeak,
  name: NodeName,
  serial: u64,
  reason: PeerDown,
  state: &watch::Sender<PeerState>,
  token: &CancellationToken,
) {
  // Local processes are being killed; nothing is left to notify.
  if !token.is_cancelled() {
    if let Some(this) = node.upgrade() {
      this.peer_down(name, serial, &reason);
    }
  }

  state.send_replace(PeerState::Down(reason));
}

// -----------------------------------------------------------------------------
// Inbound
// -----------------------------------------------------------------------------

/// Accepts connections on `endpoint` until it is closed.
pub(crate) async fn run_acceptor(node: NodeWeak, endpoint: Arc<dyn Endpoint>, token: CancellationToken, timeout: Duration) {
  loop {
    let result: Result<Connection, TransportError> = tokio::select! {
      biased;
      () = token.cancelled() => break,
      result = endpoint.accept() => result,
    };

    match result {
      Ok(conn) => {
        drop(tokio::spawn(run_inbound(node.clone(), conn, token.clone(), timeout)));
      }
      Err(TransportError::Closed) => break,
      Err(error) => {
        tracing::warn!(%error, "Dist Accept");
      }
    }
  }

  tracing::trace!(address = endpoint.address(), "Dist Listen Stop");
}

async fn run_inbound(node: NodeWeak, conn: Connection, token: CancellationToken, timeout: Duration) {
  let Connection { mut sink, mut stream } = conn;

  let remote: NodeId = match time::timeout(timeout, stream.recv()).await {
    Ok(Some(frame)) => match DistMessage::decode(&frame) {
      Ok(DistMessage::Hello { node }) => node,
      Ok(message) => {
        tracing::warn!(kind = message.kind(), "Dist Handshake");
        return;
      }
      Err(error) => {
        tracing::warn!(%error, "Dist Handshake");
        return;
      }
    },
    Ok(None) => return,
    Err(_) => {
      tracing::debug!(reason = "timed out", "Dist Handshake");
      return;
    }
  };

  let Some(local) = node.upgrade().map(|this| this.id) else {
    return;
  };

  let welcome: bytes::Bytes = match (DistMessage::Welcome { node: local }).encode() {
    Ok(frame) => frame,
    Err(error) => {
      tracing::warn!(%error, "Dist Handshake");
      return;
    }
  };

  if sink.send(welcome).await.is_err() {
    return;
  }

  tracing::debug!(%remote, "Dist Accept");

  loop {
    let frame: Option<bytes::Bytes> = tokio::select! {
      biased;
      () = token.cancelled() => break,
      frame = stream.recv() => frame,
    };

    let Some(frame) = frame else {
      break;
    };

    let Some(this) = node.upgrade() else {
      break;
    };

    match DistMessage::decode(&frame) {
      Ok(message) => this.dispatch(remote, message),
      Err(error) => tracing::warn!(%remote, %error, "Dist Decode"),
    }
  }

  // The sink is held until here; dropping it early reads as a lost
  // connection on the other side.
  drop(sink);

  tracing::debug!(%remote, "Dist Closed");
}
