use futures::FutureExt;
use futures::future::BoxFuture;
use hashbrown::HashMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;

use crate::core::Item;
use crate::core::Term;
use crate::erts::SpawnError;

pub(crate) type RemoteFn = Arc<dyn Fn(Term) -> Result<BoxFuture<'static, ()>, SpawnError> + Send + Sync>;

/// Process bodies other nodes may spawn on this node, keyed by stable name.
///
/// Each entry receives one argument of a fixed [`Item`] type; an argument of
/// any other type is rejected with [`SpawnError::BadArgument`].
///
/// # Examples
///
/// ```
/// use tarazed::node::RemoteTable;
///
/// let table: RemoteTable = RemoteTable::new()
///   .with("greet", |name: String| async move {
///     println!("hello, {name}");
///   });
///
/// assert!(table.contains("greet"));
/// ```
#[derive(Clone, Default)]
pub struct RemoteTable {
  entries: HashMap<String, RemoteFn>,
}

impl RemoteTable {
  /// Creates an empty remote table.
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `f` under `name`, replacing any previous entry.
  pub fn register<T, F, Fut>(&mut self, name: impl Into<String>, f: F)
  where
    T: Item,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let entry: RemoteFn = Arc::new(move |term: Term| match term.downcast::<T>() {
      Ok(args) => Ok(f(args).boxed()),
      Err(term) => Err(SpawnError::BadArgument(format!(
        "expected {}, found {}",
        std::any::type_name::<T>(),
        term.type_name(),
      ))),
    });

    self.entries.insert(name.into(), entry);
  }

  /// Registers `f` under `name` and returns the table.
  #[inline]
  pub fn with<T, F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
  where
    T: Item,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    self.register(name, f);
    self
  }

  /// Returns `true` if an entry is registered under `name`.
  #[inline]
  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  /// Returns the registered names.
  pub fn names(&self) -> Vec<&str> {
    self.entries.keys().map(String::as_str).collect()
  }

  #[inline]
  pub(crate) fn get(&self, name: &str) -> Option<RemoteFn> {
    self.entries.get(name).cloned()
  }
}

impl Debug for RemoteTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_set().entries(self.entries.keys()).finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Term;
  use crate::erts::SpawnError;
  use crate::node::RemoteTable;

  #[test]
  fn test_lookup() {
    let table: RemoteTable = RemoteTable::new().with("noop", |_: u32| async {});

    assert!(table.contains("noop"));
    assert!(!table.contains("other"));
    assert_eq!(table.names(), vec!["noop"]);
  }

  #[test]
  fn test_argument_type_checked() {
    let table: RemoteTable = RemoteTable::new().with("noop", |_: u32| async {});
    let entry: _ = table.get("noop").unwrap();

    assert!(entry(Term::new(5_u32)).is_ok());
    assert!(matches!(entry(Term::new(String::from("five"))), Err(SpawnError::BadArgument(_))));
  }
}
