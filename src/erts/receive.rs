use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use tokio::sync::Notify;

use crate::core::Item;
use crate::core::ProcessId;
use crate::erts::Envelope;
use crate::erts::ReceivePort;
use crate::proc::ProcMail;
use crate::raise;

type Test<'a> = Box<dyn FnMut(&mut Envelope) -> bool + Send + 'a>;
type Run<'a, R> = Box<dyn FnOnce(Envelope) -> R + Send + 'a>;

// -----------------------------------------------------------------------------
// Match
// -----------------------------------------------------------------------------

/// One arm of a selective receive.
///
/// A mailbox arm pairs a type test (and an optional refinement on the
/// value) with the function that consumes the matching message. Encoded
/// remote payloads are decoded only once their tag matches; a payload that
/// fails to decode does not match and stays queued.
///
/// A port arm waits on a channel [`ReceivePort`] instead of the mailbox.
///
/// Arms are tried in declaration order. Within an arm the oldest matching
/// message wins.
///
/// # Examples
///
/// ```no_run
/// use tarazed::erts::Match;
/// use tarazed::erts::Process;
///
/// use std::time::Duration;
///
/// # async fn example() {
/// let reply: String = Process::receive_match(vec![
///   Match::when::<u32>(|value| *value > 10, |value| format!("big {value}")),
///   Match::new::<String>(|text| text),
/// ])
/// .await;
///
/// let other: Option<String> = Process::receive_match_timeout(
///   vec![Match::any(|envelope| format!("{envelope:?}"))],
///   Duration::from_millis(50),
/// )
/// .await;
/// # }
/// ```
pub struct Match<'a, R> {
  kind: MatchKind<'a, R>,
}

enum MatchKind<'a, R> {
  Mailbox {
    test: Test<'a>,
    run: Run<'a, R>,
    marker: usize,
  },
  Port(Box<dyn PortMatch<R> + Send + 'a>),
}

impl<'a, R> Match<'a, R> {
  fn mailbox(test: Test<'a>, run: Run<'a, R>) -> Self {
    Self {
      kind: MatchKind::Mailbox { test, run, marker: 0 },
    }
  }

  /// Matches any message of type `T`.
  pub fn new<T>(f: impl FnOnce(T) -> R + Send + 'a) -> Self
  where
    T: Item,
  {
    Self::mailbox(
      Box::new(|envelope| envelope.term_mut().resolve::<T>()),
      Box::new(move |envelope| f(take::<T>(envelope).1)),
    )
  }

  /// Matches messages of type `T` accepted by `filter`.
  ///
  /// `filter` runs while the mailbox is locked and must not call into
  /// [`Process`].
  ///
  /// [`Process`]: crate::erts::Process
  pub fn when<T>(mut filter: impl FnMut(&T) -> bool + Send + 'a, f: impl FnOnce(T) -> R + Send + 'a) -> Self
  where
    T: Item,
  {
    Self::mailbox(
      Box::new(move |envelope| {
        envelope.term_mut().resolve::<T>() && envelope.term().downcast_ref::<T>().is_some_and(&mut filter)
      }),
      Box::new(move |envelope| f(take::<T>(envelope).1)),
    )
  }

  /// Matches any message of type `T`, passing its sender to `f`.
  pub fn with_sender<T>(f: impl FnOnce(Option<ProcessId>, T) -> R + Send + 'a) -> Self
  where
    T: Item,
  {
    Self::mailbox(
      Box::new(|envelope| envelope.term_mut().resolve::<T>()),
      Box::new(move |envelope| {
        let (from, value): (Option<ProcessId>, T) = take::<T>(envelope);
        f(from, value)
      }),
    )
  }

  /// Matches the oldest message of any type.
  pub fn any(f: impl FnOnce(Envelope) -> R + Send + 'a) -> Self {
    Self::mailbox(Box::new(|_| true), Box::new(f))
  }

  /// Matches the next value arriving on `port`.
  pub fn port<T>(port: &'a mut ReceivePort<T>, f: impl FnOnce(T) -> R + Send + 'a) -> Self
  where
    T: Item,
    R: 'a,
  {
    Self {
      kind: MatchKind::Port(Box::new(PortArm { port, run: Some(f) })),
    }
  }

  /// Returns the wakers this arm waits on, besides the mailbox.
  pub(crate) fn notifiers(&self) -> Vec<triomphe::Arc<Notify>> {
    match self.kind {
      MatchKind::Mailbox { .. } => Vec::new(),
      MatchKind::Port(ref port) => port.notifiers(),
    }
  }

  /// Returns `true` if this arm reads from the mailbox.
  pub(crate) fn is_mailbox(&self) -> bool {
    matches!(self.kind, MatchKind::Mailbox { .. })
  }

  /// Takes the first message in `inbox` accepted by this arm.
  pub(crate) fn poll_mailbox(&mut self, inbox: &mut ProcMail) -> Option<Envelope> {
    match self.kind {
      MatchKind::Mailbox {
        ref mut test,
        ref mut marker,
        ..
      } => inbox.poll(test, marker),
      MatchKind::Port(_) => None,
    }
  }

  /// Takes the next value from the port of this arm and runs it.
  pub(crate) fn poll_port(&mut self) -> Option<R> {
    match self.kind {
      MatchKind::Mailbox { .. } => None,
      MatchKind::Port(ref mut port) => port.try_take(),
    }
  }

  /// Consumes a message taken by [`poll_mailbox`].
  ///
  /// [`poll_mailbox`]: Self::poll_mailbox
  pub(crate) fn run(self, envelope: Envelope) -> R {
    match self.kind {
      MatchKind::Mailbox { run, .. } => run(envelope),
      MatchKind::Port(_) => raise!(Error, SysInv, "mailbox message routed to port"),
    }
  }
}

impl<R> Debug for Match<'_, R> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self.kind {
      MatchKind::Mailbox { marker, .. } => write!(f, "Match::Mailbox({marker})"),
      MatchKind::Port(_) => f.write_str("Match::Port"),
    }
  }
}

fn take<T>(envelope: Envelope) -> (Option<ProcessId>, T)
where
  T: Item,
{
  let from: Option<ProcessId> = envelope.from();

  match envelope.downcast::<T>() {
    Ok(value) => (from, value),
    Err(_) => raise!(Error, SysInv, "matched message changed type"),
  }
}

// -----------------------------------------------------------------------------
// Port Match
// -----------------------------------------------------------------------------

trait PortMatch<R> {
  fn notifiers(&self) -> Vec<triomphe::Arc<Notify>>;

  fn try_take(&mut self) -> Option<R>;
}

struct PortArm<'a, T, F> {
  port: &'a mut ReceivePort<T>,
  run: Option<F>,
}

impl<T, F, R> PortMatch<R> for PortArm<'_, T, F>
where
  T: Item,
  F: FnOnce(T) -> R,
{
  fn notifiers(&self) -> Vec<triomphe::Arc<Notify>> {
    self.port.notifiers()
  }

  fn try_take(&mut self) -> Option<R> {
    if self.run.is_none() {
      return None;
    }

    let value: T = self.port.try_recv()?;
    let run: F = self.run.take()?;

    Some(run(value))
  }
}
