//! Slot table for concurrent process storage and lookup.
//!
//! Each slot carries a serial that is bumped every time the slot is vacated.
//! A [`LocalPid`] names a slot index together with the serial it was issued
//! under, so lookups with a stale PID miss even after the slot is reused.
//! A slot whose serial reaches [`MAX_PROC_SERIAL`] is retired instead of
//! being returned to the free list.
//!
//! Insertion, removal and lookup take a single short-lived lock; values are
//! handed out as [`Arc`]s so no lock is held while a process runs.

use crossbeam_utils::CachePadded;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use thiserror::Error;
use triomphe::Arc;

use crate::consts::MAX_PROC_SERIAL;
use crate::core::LocalPid;
use crate::loom::sync::Mutex;
use crate::loom::sync::MutexGuard;
use crate::loom::sync::atomic::AtomicUsize;
use crate::loom::sync::atomic::Ordering;

// -----------------------------------------------------------------------------
// Process Table Error
// -----------------------------------------------------------------------------

/// Errors returned when inserting into a [`ProcTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProcTableError {
  /// The table holds its maximum number of entries.
  #[error("process table full")]
  Full,
}

// -----------------------------------------------------------------------------
// Process Table
// -----------------------------------------------------------------------------

struct Slot<T> {
  serial: u32,
  value: Option<Arc<T>>,
}

struct Slots<T> {
  data: Vec<Slot<T>>,
  free: VecDeque<u32>,
}

/// Concurrent table of process entries keyed by [`LocalPid`].
#[doc(hidden)]
pub struct ProcTable<T> {
  slots: Mutex<Slots<T>>,
  count: CachePadded<AtomicUsize>,
  limit: usize,
}

impl<T> ProcTable<T> {
  /// Default number of entries a table can hold.
  pub const DEF_ENTRIES: usize = 1 << 20;

  /// Creates a new table with the default capacity.
  #[inline]
  pub fn new() -> Self {
    Self::with_capacity(Self::DEF_ENTRIES)
  }

  /// Creates a new table holding at most `limit` entries.
  pub fn with_capacity(limit: usize) -> Self {
    Self {
      slots: Mutex::new(Slots {
        data: Vec::new(),
        free: VecDeque::new(),
      }),
      count: CachePadded::new(AtomicUsize::new(0)),
      limit: limit.min(u32::MAX as usize),
    }
  }

  /// Returns the maximum number of entries.
  #[inline]
  pub const fn capacity(&self) -> usize {
    self.limit
  }

  /// Returns the number of live entries.
  #[inline]
  pub fn len(&self) -> usize {
    self.count.load(Ordering::Acquire)
  }

  /// Returns `true` if the table holds no entries.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Allocates a slot and stores the value built by `init`.
  ///
  /// `init` receives the PID of the new entry and runs under the table
  /// lock; it must not access the table.
  pub fn insert<F>(&self, init: F) -> Result<Arc<T>, ProcTableError>
  where
    F: FnOnce(LocalPid) -> T,
  {
    let mut slots: MutexGuard<'_, Slots<T>> = self.slots.lock();

    let index: u32 = match slots.free.pop_front() {
      Some(index) => index,
      None if slots.data.len() < self.limit => {
        slots.data.push(Slot {
          serial: 0,
          value: None,
        });

        (slots.data.len() - 1) as u32
      }
      None => return Err(ProcTableError::Full),
    };

    let slot: &mut Slot<T> = &mut slots.data[index as usize];
    let value: Arc<T> = Arc::new(init(LocalPid::new(index, slot.serial)));

    slot.value = Some(Arc::clone(&value));

    self.count.fetch_add(1, Ordering::AcqRel);

    Ok(value)
  }

  /// Returns the entry for `pid`, if it is still live.
  pub fn get(&self, pid: LocalPid) -> Option<Arc<T>> {
    let slots: MutexGuard<'_, Slots<T>> = self.slots.lock();

    match slots.data.get(pid.index() as usize) {
      Some(slot) if slot.serial == pid.serial() => slot.value.clone(),
      Some(_) | None => None,
    }
  }

  /// Removes and returns the entry for `pid`.
  ///
  /// Returns [`None`] if `pid` is not live; at most one caller removes a
  /// given entry.
  pub fn remove(&self, pid: LocalPid) -> Option<Arc<T>> {
    let mut slots: MutexGuard<'_, Slots<T>> = self.slots.lock();

    let slot: &mut Slot<T> = match slots.data.get_mut(pid.index() as usize) {
      Some(slot) if slot.serial == pid.serial() && slot.value.is_some() => slot,
      Some(_) | None => return None,
    };

    let value: Option<Arc<T>> = slot.value.take();

    slot.serial = slot.serial.saturating_add(1);

    if slot.serial < MAX_PROC_SERIAL {
      slots.free.push_back(pid.index());
    }

    self.count.fetch_sub(1, Ordering::AcqRel);

    value
  }

  /// Returns a snapshot of the live PIDs.
  ///
  /// Entries may be inserted or removed after the snapshot is taken.
  pub fn keys(&self) -> Vec<LocalPid> {
    let slots: MutexGuard<'_, Slots<T>> = self.slots.lock();

    slots
      .data
      .iter()
      .enumerate()
      .filter(|(_, slot)| slot.value.is_some())
      .map(|(index, slot)| LocalPid::new(index as u32, slot.serial))
      .collect()
  }
}

impl<T> Debug for ProcTable<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("ProcTable")
      .field("len", &self.len())
      .field("capacity", &self.capacity())
      .finish_non_exhaustive()
  }
}

impl<T> Default for ProcTable<T> {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(all(test, not(loom)))]
mod tests {
  use triomphe::Arc;

  use crate::core::LocalPid;
  use crate::core::ProcTable;
  use crate::core::ProcTableError;

  fn insert(table: &ProcTable<u64>, value: u64) -> LocalPid {
    let mut result: Option<LocalPid> = None;

    table
      .insert(|pid| {
        result = Some(pid);
        value
      })
      .unwrap();

    result.unwrap()
  }

  #[test]
  fn test_insert_get_remove() {
    let table: ProcTable<u64> = ProcTable::new();
    let pid: LocalPid = insert(&table, 42);

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(pid).as_deref(), Some(&42));
    assert_eq!(table.remove(pid).as_deref(), Some(&42));
    assert_eq!(table.get(pid), None);
    assert_eq!(table.remove(pid), None);
    assert!(table.is_empty());
  }

  #[test]
  fn test_reused_slot_gets_new_serial() {
    let table: ProcTable<u64> = ProcTable::new();
    let old: LocalPid = insert(&table, 1);

    table.remove(old);

    let new: LocalPid = insert(&table, 2);

    assert_eq!(old.index(), new.index());
    assert_ne!(old.serial(), new.serial());
    assert_eq!(table.get(old), None);
    assert_eq!(table.get(new).as_deref(), Some(&2));
  }

  #[test]
  fn test_capacity() {
    let table: ProcTable<u64> = ProcTable::with_capacity(2);

    insert(&table, 1);
    insert(&table, 2);

    assert_eq!(table.insert(|_| 3).unwrap_err(), ProcTableError::Full);
  }

  #[test]
  fn test_keys_snapshot() {
    let table: ProcTable<u64> = ProcTable::new();
    let a: LocalPid = insert(&table, 1);
    let b: LocalPid = insert(&table, 2);
    let c: LocalPid = insert(&table, 3);

    table.remove(b);

    assert_eq!(table.keys(), vec![a, c]);
  }

  #[test]
  fn test_value_outlives_removal() {
    let table: ProcTable<u64> = ProcTable::new();
    let pid: LocalPid = insert(&table, 9);
    let held: Arc<u64> = table.get(pid).unwrap();

    table.remove(pid);

    assert_eq!(*held, 9);
  }
}
