//! Global interning table for node names.
//!
//! Node names are compared on every cross-process operation, so they are
//! interned once and referenced by a numeric slot afterwards. Interned
//! names are never deallocated.
//!
//! The table enforces [`MAX_NODE_NAME_COUNT`] and [`MAX_NODE_NAME_BYTES`];
//! avoid interning names derived from untrusted input.

use hashbrown::HashMap;
use parking_lot::RwLock;
use parking_lot::RwLockUpgradableReadGuard;
use parking_lot::RwLockWriteGuard;
use thiserror::Error;

use crate::consts::MAX_NODE_NAME_BYTES;
use crate::consts::MAX_NODE_NAME_COUNT;

// -----------------------------------------------------------------------------
// Name Table Error
// -----------------------------------------------------------------------------

/// Errors returned when interning a node name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NameTableError {
  /// The name exceeds [`MAX_NODE_NAME_BYTES`].
  #[error("node name too large")]
  NameTooLarge,
  /// The table already holds [`MAX_NODE_NAME_COUNT`] names.
  #[error("too many node names")]
  TooManyNames,
}

// -----------------------------------------------------------------------------
// Name Table
// -----------------------------------------------------------------------------

/// Thread-safe interning table with permanent storage.
pub(crate) struct NameTable {
  inner: RwLock<Table>,
}

struct Table {
  map: HashMap<&'static str, u32>,
  arr: Vec<&'static str>,
}

impl NameTable {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      inner: RwLock::new(Table {
        map: HashMap::new(),
        arr: Vec::new(),
      }),
    }
  }

  /// Returns the name stored in `slot`.
  #[inline]
  pub(crate) fn get(&self, slot: u32) -> Option<&'static str> {
    self.inner.read().arr.get(slot as usize).copied()
  }

  /// Interns `data` and returns its slot.
  ///
  /// Existing names only take the upgradable read lock.
  pub(crate) fn set(&self, data: &str) -> Result<u32, NameTableError> {
    if data.len() > MAX_NODE_NAME_BYTES {
      return Err(NameTableError::NameTooLarge);
    }

    let guard: RwLockUpgradableReadGuard<'_, Table> = self.inner.upgradable_read();

    if let Some(slot) = guard.map.get(data) {
      return Ok(*slot);
    }

    if guard.arr.len() >= MAX_NODE_NAME_COUNT {
      return Err(NameTableError::TooManyNames);
    }

    let mut guard: RwLockWriteGuard<'_, Table> = RwLockUpgradableReadGuard::upgrade(guard);
    let value: &'static str = Box::leak(data.to_owned().into_boxed_str());
    let slot: u32 = guard.arr.len() as u32;

    guard.arr.push(value);
    guard.map.insert(value, slot);

    Ok(slot)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
