use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;
use std::sync::LazyLock;

use crate::core::NameTable;
use crate::core::NameTableError;
use crate::raise;

static NAMES: LazyLock<NameTable> = LazyLock::new(NameTable::new);

/// Interned transport address identifying a node.
///
/// A node is named after the address its endpoint is bound to, so a name
/// is also the address used to reach it. Comparison and hashing use the
/// interned slot; serialization uses the string.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeName {
  slot: u32,
}

impl NodeName {
  /// Interns `name`.
  ///
  /// # Panics
  ///
  /// Raises an exception if the name table rejects `name`.
  #[inline]
  pub fn new(name: &str) -> Self {
    match Self::try_new(name) {
      Ok(this) => this,
      Err(error) => raise!(Error, SysCap, error),
    }
  }

  /// Interns `name`, returning an error if the name table rejects it.
  #[inline]
  pub fn try_new(name: &str) -> std::result::Result<Self, NameTableError> {
    NAMES.set(name).map(|slot| Self { slot })
  }

  /// Returns the name as a string slice.
  #[inline]
  pub fn as_str(&self) -> &'static str {
    match NAMES.get(self.slot) {
      Some(name) => name,
      None => raise!(Error, SysInv, "dangling node name"),
    }
  }
}

impl Debug for NodeName {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Debug::fmt(self.as_str(), f)
  }
}

impl Display for NodeName {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    f.write_str(self.as_str())
  }
}

impl From<&str> for NodeName {
  #[inline]
  fn from(other: &str) -> Self {
    Self::new(other)
  }
}

impl Serialize for NodeName {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for NodeName {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let name: String = String::deserialize(deserializer)?;
    Self::try_new(&name).map_err(D::Error::custom)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
