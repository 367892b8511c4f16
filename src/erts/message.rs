use serde::Deserialize;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::Exit;
use crate::core::Item;
use crate::core::MonitorRef;
use crate::core::NodeName;
use crate::core::ProcessId;
use crate::core::Tag;
use crate::core::Term;

// -----------------------------------------------------------------------------
// Envelope
// -----------------------------------------------------------------------------

/// A message queued in a process mailbox.
///
/// Carries the payload, its type tag, and the sender when the message was
/// sent from inside a process.
#[derive(Clone)]
pub struct Envelope {
  from: Option<ProcessId>,
  term: Term,
}

impl Envelope {
  #[inline]
  pub(crate) const fn new(from: Option<ProcessId>, term: Term) -> Self {
    Self { from, term }
  }

  /// Returns the sender of the message.
  #[inline]
  pub const fn from(&self) -> Option<ProcessId> {
    self.from
  }

  /// Returns the type tag of the payload.
  #[inline]
  pub fn tag(&self) -> Tag {
    self.term.tag()
  }

  /// Returns a reference to the payload.
  #[inline]
  pub const fn term(&self) -> &Term {
    &self.term
  }

  /// Returns a mutable reference to the payload.
  #[inline]
  pub(crate) fn term_mut(&mut self) -> &mut Term {
    &mut self.term
  }

  /// Consumes the envelope, returning the payload.
  #[inline]
  pub fn into_term(self) -> Term {
    self.term
  }

  /// Returns `true` if the payload has type `T`.
  #[inline]
  pub fn is<T>(&self) -> bool
  where
    T: Item,
  {
    self.term.is::<T>()
  }

  /// Converts the payload into a value of type `T`.
  ///
  /// Returns the envelope unchanged if the payload is not a `T`.
  pub fn downcast<T>(self) -> Result<T, Self>
  where
    T: Item,
  {
    let from: Option<ProcessId> = self.from;

    self.term.downcast().map_err(|term| Self::new(from, term))
  }
}

impl Debug for Envelope {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self.from {
      Some(ref from) => write!(f, "{from} -> {:?}", self.term),
      None => Debug::fmt(&self.term, f),
    }
  }
}

// -----------------------------------------------------------------------------
// Exit Message
// -----------------------------------------------------------------------------

/// A trapped exit signal, delivered when [`TRAP_EXIT`] is set.
///
/// [`TRAP_EXIT`]: crate::erts::ProcessFlags::TRAP_EXIT
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExitMessage {
  from: Option<ProcessId>,
  exit: Exit,
}

impl ExitMessage {
  #[inline]
  pub(crate) const fn new(from: Option<ProcessId>, exit: Exit) -> Self {
    Self { from, exit }
  }

  /// Returns the sender of the exit signal.
  #[inline]
  pub const fn from(&self) -> Option<ProcessId> {
    self.from
  }

  /// Returns the exit reason.
  #[inline]
  pub const fn exit(&self) -> &Exit {
    &self.exit
  }
}

// -----------------------------------------------------------------------------
// Down Message
// -----------------------------------------------------------------------------

/// Notification that a monitored process terminated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownMessage {
  mref: MonitorRef,
  item: ProcessId,
  info: Exit,
}

impl DownMessage {
  #[inline]
  pub(crate) const fn new(mref: MonitorRef, item: ProcessId, info: Exit) -> Self {
    Self { mref, item, info }
  }

  /// Returns the monitor reference.
  #[inline]
  pub const fn mref(&self) -> MonitorRef {
    self.mref
  }

  /// Returns the monitored process.
  #[inline]
  pub const fn item(&self) -> ProcessId {
    self.item
  }

  /// Returns the exit reason of the monitored process.
  #[inline]
  pub const fn info(&self) -> &Exit {
    &self.info
  }
}

// -----------------------------------------------------------------------------
// Node Down Message
// -----------------------------------------------------------------------------

/// Notification that a monitored node became unreachable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDownMessage {
  mref: MonitorRef,
  node: NodeName,
}

impl NodeDownMessage {
  #[inline]
  pub(crate) const fn new(mref: MonitorRef, node: NodeName) -> Self {
    Self { mref, node }
  }

  /// Returns the monitor reference.
  #[inline]
  pub const fn mref(&self) -> MonitorRef {
    self.mref
  }

  /// Returns the node that went down.
  #[inline]
  pub const fn node(&self) -> NodeName {
    self.node
  }
}
