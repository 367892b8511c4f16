use thiserror::Error;

use crate::core::NameTableError;
use crate::dist::TransportError;

/// Errors returned by [`Node`] creation and connection management.
///
/// [`Node`]: crate::node::Node
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NodeError {
  /// The endpoint could not be bound.
  #[error("failed to bind `{address}`")]
  TransportBind {
    address: String,
    #[source]
    source: TransportError,
  },
  /// The bound address is not usable as a node name.
  #[error("invalid node name `{address}`")]
  InvalidName {
    address: String,
    #[source]
    source: NameTableError,
  },
  /// The node at `address` could not be reached.
  #[error("failed to connect to `{address}`: {reason}")]
  Connect { address: String, reason: String },
  /// The node at `address` answered with an invalid handshake.
  #[error("handshake with `{address}` failed: {reason}")]
  Handshake { address: String, reason: String },
  /// The local node has been shut down.
  #[error("node is shut down")]
  Shutdown,
}
