//! Exceptions raised by runtime operations.
//!
//! Operations that cannot return an error, such as [`Process::register`] or
//! [`Process::spawn_link`], raise an [`Exception`] instead. Raising unwinds
//! the calling process; the exception then becomes its exit reason, so
//! linked and monitoring processes observe it like any other failure:
//!
//! ```no_run
//! use tarazed::core::ProcessId;
//! use tarazed::erts::DownMessage;
//! use tarazed::erts::Process;
//! use tarazed::error::Exception;
//! use tarazed::error::ExceptionGroup;
//!
//! # async fn example() {
//! let (_pid, _mref) = Process::spawn_monitor(async {
//!   Process::register(Process::this(), "taken");
//!   Process::register(Process::this(), "taken");
//! });
//!
//! let down: DownMessage = Process::receive().await;
//! let error: Option<Exception> = down.info().reason::<Exception>();
//!
//! assert_eq!(error.map(|error| error.group()), Some(ExceptionGroup::BadArg));
//! # }
//! ```
//!
//! Exceptions raised outside a process surface as ordinary panics.
//!
//! [`Process::register`]: crate::erts::Process::register
//! [`Process::spawn_link`]: crate::erts::Process::spawn_link

mod exception;

pub use self::exception::Exception;
pub use self::exception::ExceptionClass;
pub use self::exception::ExceptionGroup;

/// Raises an [`Exception`] with the given class, group and message.
///
/// ```
/// # use tarazed::raise;
/// fn set_limit(limit: usize) {
///   if limit == 0 {
///     raise!(Error, BadArg, "limit must be positive");
///   }
/// }
/// ```
#[macro_export]
macro_rules! raise {
  ($class:ident, $group:ident, $error:expr $(,)?) => {
    ::std::panic::panic_any($crate::error::Exception::new(
      $crate::error::ExceptionClass::$class,
      $crate::error::ExceptionGroup::$group,
      $error,
    ))
  };
}

#[cfg(test)]
mod tests {
  use std::panic;

  use crate::error::Exception;
  use crate::error::ExceptionGroup;

  fn caught(f: impl FnOnce() + panic::UnwindSafe) -> Exception {
    match panic::catch_unwind(f) {
      Ok(()) => panic!("nothing raised"),
      Err(payload) => match payload.downcast::<Exception>() {
        Ok(exception) => *exception,
        Err(_) => panic!("payload is not an exception"),
      },
    }
  }

  #[test]
  fn test_payload_is_exception() {
    let exception: Exception = caught(|| raise!(Error, SysCap, "table full"));

    assert_eq!(exception.group(), ExceptionGroup::SysCap);
    assert_eq!(exception.message(), "table full");
  }

  #[test]
  fn test_message_from_display() {
    let exception: Exception = caught(|| raise!(Error, BadArg, format_args!("bad name `{}`", "x")));

    assert_eq!(exception.to_string(), "error:badarg - bad name `x`");
  }
}
