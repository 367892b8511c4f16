//! Wire protocol between nodes.
//!
//! Every frame carries one postcard-encoded [`DistMessage`]. The connecting
//! side opens with [`DistMessage::Hello`] and the accepting side answers
//! with [`DistMessage::Welcome`]; each connection carries traffic in one
//! direction after the handshake.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::core::ChannelId;
use crate::core::MonitorRef;
use crate::core::NodeId;
use crate::core::ProcessId;
use crate::core::Term;
use crate::erts::Signal;
use crate::erts::SpawnReply;

/// Distribution protocol messages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum DistMessage {
  /// Handshake from the connecting node.
  Hello { node: NodeId },
  /// Handshake reply from the accepting node.
  Welcome { node: NodeId },
  /// A signal addressed to a process of the receiving node.
  Signal { to: ProcessId, signal: Signal },
  /// A value for a channel owned by the receiving node.
  Chan { id: ChannelId, term: Term },
  /// A message for a registered name on the receiving node.
  NamedSend {
    name: String,
    from: Option<ProcessId>,
    term: Term,
  },
  /// Request to spawn an entry of the receiving node's remote table.
  Spawn {
    sref: MonitorRef,
    name: String,
    args: Term,
  },
  /// Outcome of a [`DistMessage::Spawn`] request.
  SpawnReply(SpawnReply),
}

impl DistMessage {
  /// Returns a short label for logging.
  pub(crate) const fn kind(&self) -> &'static str {
    match self {
      Self::Hello { .. } => "hello",
      Self::Welcome { .. } => "welcome",
      Self::Signal { .. } => "signal",
      Self::Chan { .. } => "chan",
      Self::NamedSend { .. } => "named-send",
      Self::Spawn { .. } => "spawn",
      Self::SpawnReply(_) => "spawn-reply",
    }
  }

  pub(crate) fn encode(&self) -> Result<Bytes, postcard::Error> {
    postcard::to_stdvec(self).map(Bytes::from)
  }

  pub(crate) fn decode(frame: &[u8]) -> Result<Self, postcard::Error> {
    postcard::from_bytes(frame)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use bytes::Bytes;

  use crate::core::LocalPid;
  use crate::core::MonitorRef;
  use crate::core::NodeId;
  use crate::core::NodeName;
  use crate::core::ProcessId;
  use crate::core::Term;
  use crate::dist::DistMessage;
  use crate::erts::SpawnError;
  use crate::erts::SpawnReply;

  fn node() -> NodeId {
    NodeId::new(NodeName::new("proto-test"), 3)
  }

  fn pid(index: u32) -> ProcessId {
    ProcessId::new(node(), LocalPid::new(index, 0))
  }

  #[test]
  fn test_payload_decodes_lazily() {
    let message: DistMessage = DistMessage::NamedSend {
      name: String::from("echo"),
      from: Some(pid(1)),
      term: Term::new(String::from("ping")),
    };

    let frame: Bytes = message.encode().unwrap();

    let DistMessage::NamedSend { name, from, mut term } = DistMessage::decode(&frame).unwrap() else {
      panic!("expected named send");
    };

    assert_eq!(name, "echo");
    assert_eq!(from, Some(pid(1)));
    assert!(term.is_encoded());
    assert!(!term.resolve::<u64>());
    assert!(term.resolve::<String>());
    assert_eq!(term.downcast_ref::<String>().map(String::as_str), Some("ping"));
  }

  #[test]
  fn test_spawn_error_survives() {
    let reply: SpawnReply = SpawnReply {
      sref: MonitorRef::new(node(), 9),
      result: Err(SpawnError::NotRegistered(String::from("worker"))),
    };

    let frame: Bytes = DistMessage::SpawnReply(reply).encode().unwrap();

    let DistMessage::SpawnReply(reply) = DistMessage::decode(&frame).unwrap() else {
      panic!("expected spawn reply");
    };

    assert_eq!(reply.sref, MonitorRef::new(node(), 9));
    assert_eq!(reply.result, Err(SpawnError::NotRegistered(String::from("worker"))));
  }

  #[test]
  fn test_garbage_rejected() {
    assert!(DistMessage::decode(&[0xff, 0xff, 0xff]).is_err());
  }
}
