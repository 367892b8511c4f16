#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tarazed::dist::MemoryTransport;
use tarazed::node::Node;
use tarazed::node::RemoteTable;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(5);

static NEXT: AtomicUsize = AtomicUsize::new(0);

/// Returns a memory address no other test uses.
pub fn address(prefix: &str) -> String {
  format!("{prefix}-{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Creates a node on its own memory hub.
pub async fn node() -> Node {
  node_on(&MemoryTransport::new(), RemoteTable::new()).await
}

/// Creates a node on `hub` with the given remote table.
pub async fn node_on(hub: &MemoryTransport, remote: RemoteTable) -> Node {
  Node::create(hub.clone(), &address("node"), remote).await.unwrap()
}

/// Channel carrying results out of processes.
pub fn results<T>() -> (mpsc::UnboundedSender<T>, Results<T>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (tx, Results { rx })
}

pub struct Results<T> {
  rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Results<T> {
  /// Waits for the next result, failing the test on timeout.
  pub async fn next(&mut self) -> T {
    match tokio::time::timeout(WAIT, self.rx.recv()).await {
      Ok(Some(value)) => value,
      Ok(None) => panic!("results closed"),
      Err(_) => panic!("results timed out"),
    }
  }

  /// Returns `true` if nothing arrives within `timeout`.
  pub async fn quiet(&mut self, timeout: Duration) -> bool {
    !matches!(tokio::time::timeout(timeout, self.rx.recv()).await, Ok(Some(_)))
  }
}
