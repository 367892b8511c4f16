use loom::thread;
use tarazed::core::LocalPid;
use tarazed::core::ProcTable;
use tarazed::core::ProcTableError;
use triomphe::Arc;

type Table = ProcTable<Entry>;

#[derive(Debug)]
struct Entry {
  pid: LocalPid,
  value: u64,
}

fn spawn(table: &Table, value: u64) -> Result<LocalPid, ProcTableError> {
  table.insert(|pid| Entry { pid, value }).map(|entry| entry.pid)
}

#[test]
fn reused_slot_rejects_stale_pid() {
  loom::model(|| {
    let table: Arc<Table> = Arc::new(ProcTable::new());
    let stale: LocalPid = spawn(&table, 0).unwrap();

    let t1 = {
      let table: Arc<Table> = Arc::clone(&table);

      thread::spawn(move || {
        assert!(table.remove(stale).is_some());
        spawn(&table, 1).unwrap()
      })
    };

    let t2 = {
      let table: Arc<Table> = Arc::clone(&table);
      thread::spawn(move || table.get(stale).map(|entry| entry.value))
    };

    let fresh: LocalPid = t1.join().unwrap();
    let seen: Option<u64> = t2.join().unwrap();

    // A lookup racing the reuse sees the old entry or nothing, never the new one.
    assert_ne!(seen, Some(1));
    assert_ne!(fresh, stale);
    assert!(table.get(stale).is_none());
    assert_eq!(table.get(fresh).map(|entry| entry.value), Some(1));
  });
}

#[test]
fn single_winner_on_concurrent_remove() {
  loom::model(|| {
    let table: Arc<Table> = Arc::new(ProcTable::new());
    let pid: LocalPid = spawn(&table, 7).unwrap();

    let handles: Vec<_> = (0..2)
      .map(|_| {
        let table: Arc<Table> = Arc::clone(&table);
        thread::spawn(move || table.remove(pid).is_some())
      })
      .collect();

    let removed: usize = handles
      .into_iter()
      .map(|handle| handle.join().unwrap())
      .filter(|removed| *removed)
      .count();

    assert_eq!(removed, 1);
    assert!(table.is_empty());
  });
}

#[test]
fn limit_holds_under_concurrent_spawn() {
  loom::model(|| {
    let table: Arc<Table> = Arc::new(ProcTable::with_capacity(1));

    let handles: Vec<_> = (0..2)
      .map(|value| {
        let table: Arc<Table> = Arc::clone(&table);
        thread::spawn(move || spawn(&table, value))
      })
      .collect();

    let results: Vec<Result<LocalPid, ProcTableError>> =
      handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().any(|result| matches!(result, Err(ProcTableError::Full))));
    assert_eq!(table.len(), 1);
  });
}

#[test]
fn keys_snapshot_during_remove() {
  loom::model(|| {
    let table: Arc<Table> = Arc::new(ProcTable::new());
    let a: LocalPid = spawn(&table, 0).unwrap();
    let b: LocalPid = spawn(&table, 1).unwrap();

    let t1 = {
      let table: Arc<Table> = Arc::clone(&table);
      thread::spawn(move || table.remove(a))
    };

    let keys: Vec<LocalPid> = table.keys();

    assert!(t1.join().unwrap().is_some());
    assert!(keys.contains(&b));
    assert!(keys.len() == 1 || keys.contains(&a));
    assert_eq!(table.keys(), vec![b]);
  });
}
