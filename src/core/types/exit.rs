use serde::Deserialize;
use serde::Serialize;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::Item;
use crate::core::Term;

/// Reason describing why a process stopped executing.
///
/// Exit reasons explain what caused a process to terminate and travel to
/// every linked and monitoring process when it does.
///
/// # Standard Exit Reasons
///
/// - [`Exit::Normal`]: The process body returned
/// - [`Exit::Killed`]: Forceful termination with no reason attached
/// - [`Exit::NoProc`]: The target of a link or monitor did not exist
/// - [`Exit::Disconnected`]: The node hosting the target became unreachable
///
/// # Custom Exit Reasons
///
/// Any [`Item`] can be used as a reason via [`Exit::Term`]. Exit handlers
/// dispatch on the type of the contained value.
///
/// # Examples
///
/// ```
/// use tarazed::core::Exit;
///
/// let exit: Exit = Exit::from("boom");
///
/// assert!(!exit.is_normal());
/// assert_eq!(exit.reason::<String>().as_deref(), Some("boom"));
/// assert_eq!(exit.to_string(), "boom");
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Exit {
  /// The process completed normally.
  Normal,
  /// The process was killed.
  Killed,
  /// The process did not exist.
  NoProc,
  /// The node hosting the process became unreachable.
  Disconnected,
  /// Exit reason represented by an arbitrary runtime value.
  Term(Term),
}

impl Exit {
  /// Creates an exit reason wrapping `reason`.
  #[inline]
  pub fn new<T>(reason: T) -> Self
  where
    T: Item,
  {
    Self::Term(Term::new(reason))
  }

  /// Returns `true` if this exit reason represents normal termination.
  #[inline]
  pub const fn is_normal(&self) -> bool {
    matches!(self, Self::Normal)
  }

  /// Returns `true` if this exit reason represents forced termination.
  #[inline]
  pub const fn is_killed(&self) -> bool {
    matches!(self, Self::Killed)
  }

  /// Returns `true` if this exit reason represents a missing process.
  #[inline]
  pub const fn is_noproc(&self) -> bool {
    matches!(self, Self::NoProc)
  }

  /// Returns `true` if this exit reason represents a disconnected node.
  #[inline]
  pub const fn is_disconnected(&self) -> bool {
    matches!(self, Self::Disconnected)
  }

  /// Decodes a custom reason in place if it holds a `T`.
  ///
  /// Returns `true` if the reason is now a local value of type `T`.
  #[inline]
  pub fn resolve<T>(&mut self) -> bool
  where
    T: Item,
  {
    match self {
      Self::Term(term) => term.resolve::<T>(),
      _ => false,
    }
  }

  /// Returns a copy of the custom reason if it holds a `T`.
  #[inline]
  pub fn reason<T>(&self) -> Option<T>
  where
    T: Item,
  {
    match self {
      Self::Term(term) => term.decode().ok(),
      _ => None,
    }
  }

  /// Converts this exit into its custom reason of type `T`.
  ///
  /// Returns the exit unchanged if it does not hold a `T`.
  pub fn downcast<T>(self) -> std::result::Result<T, Self>
  where
    T: Item,
  {
    match self {
      Self::Term(term) => term.downcast().map_err(Self::Term),
      other => Err(other),
    }
  }
}

impl Debug for Exit {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Term(inner) => Debug::fmt(inner, f),
      other => Display::fmt(other, f),
    }
  }
}

impl Display for Exit {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Normal => f.write_str("normal"),
      Self::Killed => f.write_str("killed"),
      Self::NoProc => f.write_str("noproc"),
      Self::Disconnected => f.write_str("disconnected"),
      Self::Term(inner) => Display::fmt(inner, f),
    }
  }
}

impl From<&str> for Exit {
  #[inline]
  fn from(other: &str) -> Self {
    Self::new(other.to_owned())
  }
}

impl From<String> for Exit {
  #[inline]
  fn from(other: String) -> Self {
    Self::new(other)
  }
}

impl From<Term> for Exit {
  #[inline]
  fn from(other: Term) -> Self {
    Self::Term(other)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Exit;
  use crate::core::Term;

  #[test]
  fn test_is_normal() {
    assert!(Exit::Normal.is_normal());
    assert!(!Exit::Killed.is_normal());
    assert!(!Exit::NoProc.is_normal());
    assert!(!Exit::Disconnected.is_normal());
  }

  #[test]
  fn test_is_killed() {
    assert!(Exit::Killed.is_killed());
    assert!(!Exit::Normal.is_killed());
    assert!(!Exit::from("killed").is_killed());
  }

  #[test]
  fn test_is_noproc() {
    assert!(Exit::NoProc.is_noproc());
    assert!(!Exit::Normal.is_noproc());
  }

  #[test]
  fn test_is_disconnected() {
    assert!(Exit::Disconnected.is_disconnected());
    assert!(!Exit::Normal.is_disconnected());
  }

  #[test]
  fn test_display() {
    assert_eq!(format!("{}", Exit::Normal), "normal");
    assert_eq!(format!("{}", Exit::Killed), "killed");
    assert_eq!(format!("{}", Exit::NoProc), "noproc");
    assert_eq!(format!("{}", Exit::Disconnected), "disconnected");
    assert_eq!(format!("{}", Exit::from("boom")), "boom");
  }

  #[test]
  fn test_debug_custom() {
    assert_eq!(format!("{:?}", Exit::from("boom")), "\"boom\"");
    assert_eq!(format!("{:?}", Exit::new(7_u8)), "7");
  }

  #[test]
  fn test_reason() {
    let exit: Exit = Exit::new((1_u8, String::from("shutdown")));

    assert_eq!(exit.reason::<(u8, String)>(), Some((1, String::from("shutdown"))));
    assert_eq!(exit.reason::<String>(), None);
    assert_eq!(Exit::Killed.reason::<String>(), None);
  }

  #[test]
  fn test_downcast() {
    assert_eq!(Exit::from("boom").downcast::<String>().unwrap(), "boom");
    assert_eq!(Exit::Normal.downcast::<String>().unwrap_err(), Exit::Normal);
  }

  #[test]
  fn test_from_term() {
    let term: Term = Term::new(123_u32);
    let exit: Exit = Exit::from(term.clone());

    assert_eq!(exit, Exit::Term(term));
  }

  #[test]
  fn test_serde_custom_reason() {
    let data: Vec<u8> = postcard::to_allocvec(&Exit::from("remote")).unwrap();
    let mut exit: Exit = postcard::from_bytes(&data).unwrap();

    assert!(exit.resolve::<String>());
    assert_eq!(exit, Exit::from("remote"));
  }
}
