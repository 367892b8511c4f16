use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use thiserror::Error;

/// Severity of an [`Exception`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ExceptionClass {
  /// The raising process cannot continue.
  Error,
}

impl Display for ExceptionClass {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::Error => f.write_str("error"),
    }
  }
}

/// Category of an [`Exception`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ExceptionGroup {
  /// An argument was rejected, such as a registered name already in use.
  BadArg,
  /// A node limit was reached, such as a full process table.
  SysCap,
  /// The operation is not valid in the current context, such as calling a
  /// process operation outside of a process.
  SysInv,
}

impl Display for ExceptionGroup {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::BadArg => f.write_str("badarg"),
      Self::SysCap => f.write_str("system_limit"),
      Self::SysInv => f.write_str("invalid"),
    }
  }
}

/// A runtime failure carried by unwinding.
///
/// Exceptions are plain values: they cross node boundaries as exit reasons
/// and can be recovered with [`Exit::reason`].
///
/// Formats as `{class}:{group} - {message}`.
///
/// [`Exit::reason`]: crate::core::Exit::reason
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{class}:{group} - {message}")]
pub struct Exception {
  class: ExceptionClass,
  group: ExceptionGroup,
  message: String,
}

impl Exception {
  /// Creates a new exception. Usually invoked through [`raise!`].
  ///
  /// [`raise!`]: crate::raise
  pub fn new<T>(class: ExceptionClass, group: ExceptionGroup, message: T) -> Self
  where
    T: Display,
  {
    Self {
      class,
      group,
      message: message.to_string(),
    }
  }

  #[inline]
  pub const fn class(&self) -> ExceptionClass {
    self.class
  }

  #[inline]
  pub const fn group(&self) -> ExceptionGroup {
    self.group
  }

  #[inline]
  pub fn message(&self) -> &str {
    self.message.as_str()
  }
}
