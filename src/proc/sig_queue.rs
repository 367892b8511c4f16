use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use tokio::sync::Notify;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::TryRecvError;
use triomphe::Arc;

use crate::consts::CAP_PROC_MSG_BUFFER;
use crate::core::ProcessId;
use crate::erts::Envelope;
use crate::erts::Signal;

// -----------------------------------------------------------------------------
// Proc Mail
// -----------------------------------------------------------------------------

/// Insertion-ordered mailbox with selective removal.
///
/// Messages that match no receive stay queued until the owner terminates.
/// A one-time warning is logged when the mailbox grows past `warn_len`.
pub(crate) struct ProcMail {
  mqueue: Vec<Envelope>,
  notify: Arc<Notify>,
  owner: ProcessId,
  warn_len: Option<usize>,
  warned: bool,
}

impl ProcMail {
  #[inline]
  pub(crate) fn new(owner: ProcessId, warn_len: Option<usize>) -> Self {
    Self {
      mqueue: Vec::with_capacity(CAP_PROC_MSG_BUFFER),
      notify: Arc::new(Notify::new()),
      owner,
      warn_len,
      warned: false,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.mqueue.len()
  }

  /// Returns the waker shared with blocked receives.
  #[inline]
  pub(crate) fn notify(&self) -> Arc<Notify> {
    Arc::clone(&self.notify)
  }

  pub(crate) fn push(&mut self, message: Envelope) {
    self.mqueue.push(message);

    if let Some(limit) = self.warn_len {
      if !self.warned && self.mqueue.len() > limit {
        self.warned = true;
        tracing::warn!(pid = %self.owner, len = self.mqueue.len(), "Proc Mailbox Overgrown");
      }
    }

    self.notify.notify_waiters();
  }

  /// Removes and returns the first message accepted by `filter`.
  ///
  /// Scans from `marker`, which records how much of the mailbox `filter`
  /// has already rejected.
  pub(crate) fn poll<F>(&mut self, mut filter: F, marker: &mut usize) -> Option<Envelope>
  where
    F: FnMut(&mut Envelope) -> bool,
  {
    for index in (*marker)..self.mqueue.len() {
      if filter(&mut self.mqueue[index]) {
        *marker = 0;
        return Some(self.mqueue.remove(index));
      }
    }

    *marker = self.mqueue.len();

    None
  }

  #[inline]
  pub(crate) fn retain<F>(&mut self, filter: F)
  where
    F: FnMut(&Envelope) -> bool,
  {
    self.mqueue.retain(filter);
  }

  #[inline]
  pub(crate) fn clear(&mut self) {
    self.mqueue.clear();
  }
}

impl Debug for ProcMail {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("ProcMail ")?;
    f.debug_list().entries(self.mqueue.iter()).finish()
  }
}

// -----------------------------------------------------------------------------
// Proc Recv
// -----------------------------------------------------------------------------

#[repr(transparent)]
pub(crate) struct ProcRecv {
  inner: UnboundedReceiver<Signal>,
}

impl ProcRecv {
  #[inline]
  pub(crate) async fn recv(&mut self) -> Option<Signal> {
    self.inner.recv().await
  }

  #[inline]
  pub(crate) fn try_recv(&mut self) -> Result<Signal, TryRecvError> {
    self.inner.try_recv()
  }

  /// Rejects further signals; queued signals can still be received.
  #[inline]
  pub(crate) fn close(&mut self) {
    self.inner.close();
  }
}

impl Debug for ProcRecv {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("ProcRecv(..)")
  }
}

// -----------------------------------------------------------------------------
// Proc Send
// -----------------------------------------------------------------------------

#[derive(Clone)]
#[repr(transparent)]
pub(crate) struct ProcSend {
  inner: UnboundedSender<Signal>,
}

impl ProcSend {
  /// Enqueues `signal`, returning it if the queue has been closed.
  #[inline]
  pub(crate) fn send(&self, signal: Signal) -> Result<(), Signal> {
    self.inner.send(signal).map_err(|error| error.0)
  }
}

impl Debug for ProcSend {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("ProcSend(..)")
  }
}

// -----------------------------------------------------------------------------
// Misc. Utilities
// -----------------------------------------------------------------------------

#[inline]
pub(crate) fn unbounded_channel() -> (ProcSend, ProcRecv) {
  let channel: _ = mpsc::unbounded_channel();
  let proc_send: ProcSend = ProcSend { inner: channel.0 };
  let proc_recv: ProcRecv = ProcRecv { inner: channel.1 };

  (proc_send, proc_recv)
}
