use std::io;
use thiserror::Error;

/// Errors reported by a [`Transport`].
///
/// [`Transport`]: crate::dist::Transport
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
  /// Another endpoint is bound to the address.
  #[error("address in use")]
  AddrInUse,
  /// No endpoint accepts connections at the address.
  #[error("address unreachable")]
  Unreachable,
  /// The address is not valid for this transport.
  #[error("invalid address")]
  InvalidAddress,
  /// The endpoint or connection has been closed.
  #[error("transport closed")]
  Closed,
  /// An I/O error occurred.
  #[error(transparent)]
  Io(#[from] io::Error),
}
