use std::time::Duration;

use crate::consts;

/// Per-node configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tarazed::node::NodeConfig;
///
/// let config: NodeConfig = NodeConfig {
///   connect_timeout: Duration::from_millis(500),
///   ..NodeConfig::default()
/// };
///
/// assert_eq!(config.mailbox_warn_len, Some(tarazed::consts::DEFAULT_MAILBOX_WARN_LEN));
/// ```
#[derive(Clone, Debug)]
pub struct NodeConfig {
  /// Maximum number of live processes.
  pub proc_capacity: usize,
  /// Time allowed to connect to a node and complete the handshake.
  pub connect_timeout: Duration,
  /// Time a remote spawn waits for its reply.
  pub spawn_timeout: Duration,
  /// Mailbox length at which a one-time warning is logged, if any.
  pub mailbox_warn_len: Option<usize>,
}

impl NodeConfig {
  /// Creates a configuration with default values.
  #[inline]
  pub fn new() -> Self {
    Self {
      proc_capacity: consts::DEFAULT_PROC_CAPACITY,
      connect_timeout: consts::DEFAULT_CONNECT_TIMEOUT,
      spawn_timeout: consts::DEFAULT_SPAWN_TIMEOUT,
      mailbox_warn_len: Some(consts::DEFAULT_MAILBOX_WARN_LEN),
    }
  }
}

impl Default for NodeConfig {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
