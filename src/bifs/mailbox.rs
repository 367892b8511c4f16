// -----------------------------------------------------------------------------
// Process Mailbox
// -----------------------------------------------------------------------------

use futures::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::time;
use tokio::time::Instant;
use triomphe::Arc;

use crate::bifs;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Term;
use crate::dist::DistMessage;
use crate::erts::Envelope;
use crate::erts::Match;
use crate::erts::Process;
use crate::erts::SignalEmit;
use crate::erts::SignalSend;
use crate::node::NodeInner;

/// Sends a message to `pid`.
///
/// Never fails: messages to missing, exiting or unreachable processes are
/// silently dropped.
pub(crate) fn proc_send(node: &NodeInner, from: Option<ProcessId>, pid: ProcessId, term: Term) {
  SignalSend::new(from, term).emit(node, pid);
}

/// Sends a message to the process registered as `name` on `node`.
///
/// Messages to unregistered names are silently dropped.
pub(crate) fn proc_send_named(node: &NodeInner, from: Option<ProcessId>, name: &str, term: Term) {
  let Some(pid) = bifs::proc_whereis(node, name) else {
    tracing::trace!(%name, "unregistered name");
    return;
  };

  proc_send(node, from, pid, term);
}

/// Sends a message to the process registered as `name` on the node `dest`.
pub(crate) fn proc_send_named_on(node: &NodeInner, from: Option<ProcessId>, dest: NodeName, name: &str, term: Term) {
  if dest == node.id.name() {
    return proc_send_named(node, from, name, term);
  }

  node.send_dist(
    dest,
    DistMessage::NamedSend {
      name: name.to_owned(),
      from,
      term,
    },
  );
}

/// Waits for a message or channel value accepted by one of `matches`.
///
/// Arms are checked in declaration order every time the mailbox or one of
/// the ports changes. Returns `None` once `timeout` elapses; a zero timeout
/// checks once without waiting.
pub(crate) async fn proc_receive<R>(mut matches: Vec<Match<'_, R>>, timeout: Option<Duration>) -> Option<R> {
  let deadline: Option<Instant> = timeout.map(|timeout| Instant::now() + timeout);
  let inbox: Arc<Notify> = Process::with(|this| this.internal().inbox.notify());

  loop {
    let mut notify: Vec<Arc<Notify>> = vec![Arc::clone(&inbox)];

    for arm in matches.iter() {
      notify.extend(arm.notifiers());
    }

    // Registered before checking, so a push between the check and the
    // await still wakes this receive.
    let mut waits: Vec<Pin<Box<Notified<'_>>>> = notify.iter().map(|n| Box::pin(n.notified())).collect();

    for wait in waits.iter_mut() {
      wait.as_mut().enable();
    }

    if let Some(result) = proc_receive_poll(&mut matches) {
      return Some(result);
    }

    match deadline {
      Some(deadline) if deadline <= Instant::now() => return None,
      Some(deadline) => {
        if time::timeout_at(deadline, future::select_all(waits)).await.is_err() {
          return None;
        }
      }
      None => {
        future::select_all(waits).await;
      }
    }
  }
}

fn proc_receive_poll<R>(matches: &mut Vec<Match<'_, R>>) -> Option<R> {
  for index in 0..matches.len() {
    if !matches[index].is_mailbox() {
      if let Some(result) = matches[index].poll_port() {
        return Some(result);
      }

      continue;
    }

    let taken: Option<Envelope> = Process::with(|this| {
      let _enter: _ = this.node.enter();
      matches[index].poll_mailbox(&mut this.internal().inbox)
    });

    // The arm runs after the mailbox lock is released.
    if let Some(envelope) = taken {
      return Some(matches.swap_remove(index).run(envelope));
    }
  }

  None
}
