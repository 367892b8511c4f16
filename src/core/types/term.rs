//! Type-erased runtime value container used for inter-process communication.
//!
//! A [`Term`] holds either a value moved in from the local node or the
//! encoded bytes of a value received from another node. Both forms carry the
//! value's [`Tag`], so selective receive can reject a payload by type before
//! paying for a decode. Encoded payloads are decoded lazily, the first time
//! a receiver asks for a matching type.
//!
//! # Examples
//!
//! ```
//! use tarazed::core::Term;
//!
//! let num = Term::new(42_i32);
//! let text = Term::new(String::from("hello"));
//!
//! assert_eq!(num.downcast_ref::<i32>(), Some(&42));
//! assert_eq!(num.downcast_ref::<String>(), None);
//! assert!(text.is::<String>());
//! ```

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::ser::Error as _;
use std::any::Any;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::core::DecodeError;
use crate::core::Item;
use crate::core::Tag;
use crate::error::Exception;
use crate::raise;

// -----------------------------------------------------------------------------
// Encoded Term
// -----------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
struct Encoded {
  tag: Tag,
  name: String,
  data: Vec<u8>,
}

#[derive(Clone)]
enum Repr {
  Local(Box<dyn Item>),
  Encoded(Encoded),
}

// -----------------------------------------------------------------------------
// Term
// -----------------------------------------------------------------------------

/// Dynamically typed value that can be sent between processes.
///
/// Local sends move the boxed value without encoding. A term serialized for
/// the transport is encoded with `postcard` together with its [`Tag`] and
/// type name; on the receiving node it stays encoded until [`resolve()`] or
/// [`decode()`] is called with the matching type.
///
/// [`resolve()`]: Self::resolve
/// [`decode()`]: Self::decode
#[derive(Clone)]
pub struct Term {
  repr: Repr,
}

impl Term {
  /// Creates a new term wrapping the given value.
  #[inline]
  pub fn new<T>(data: T) -> Self
  where
    T: Item,
  {
    Self {
      repr: Repr::Local(Box::new(data)),
    }
  }

  /// Returns the type tag of the contained value.
  #[inline]
  pub fn tag(&self) -> Tag {
    match self.repr {
      Repr::Local(ref item) => item.tag(),
      Repr::Encoded(ref item) => item.tag,
    }
  }

  /// Returns the type name of the contained value.
  #[inline]
  pub fn type_name(&self) -> &str {
    match self.repr {
      Repr::Local(ref item) => item.type_name(),
      Repr::Encoded(ref item) => item.name.as_str(),
    }
  }

  /// Returns `true` if the value is still in its encoded form.
  #[inline]
  pub fn is_encoded(&self) -> bool {
    matches!(self.repr, Repr::Encoded(_))
  }

  /// Returns `true` if the contained value has type `T`.
  ///
  /// For encoded values this is a tag test only; the bytes may still fail
  /// to decode.
  #[inline]
  pub fn is<T>(&self) -> bool
  where
    T: Item,
  {
    match self.repr {
      Repr::Local(ref item) => item.as_any().is::<T>(),
      Repr::Encoded(ref item) => item.tag == Tag::of::<T>(),
    }
  }

  /// Returns a shared reference to the contained value of type `T`.
  ///
  /// Returns [`None`] if the value has a different type or has not been
  /// decoded yet.
  #[inline]
  pub fn downcast_ref<T>(&self) -> Option<&T>
  where
    T: Item,
  {
    match self.repr {
      Repr::Local(ref item) => item.as_any().downcast_ref(),
      Repr::Encoded(_) => None,
    }
  }

  /// Returns a mutable reference to the contained value of type `T`.
  #[inline]
  pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
  where
    T: Item,
  {
    match self.repr {
      Repr::Local(ref mut item) => item.as_mut_any().downcast_mut(),
      Repr::Encoded(_) => None,
    }
  }

  /// Decodes the contained value in place if it is an encoded `T`.
  ///
  /// Returns `true` if the term now holds a local value of type `T`. A
  /// payload that fails to decode is left untouched.
  pub fn resolve<T>(&mut self) -> bool
  where
    T: Item,
  {
    let value: T = match self.repr {
      Repr::Local(ref item) => return item.as_any().is::<T>(),
      Repr::Encoded(ref item) if item.tag != Tag::of::<T>() => return false,
      Repr::Encoded(ref item) => match T::decode_bytes(&item.data) {
        Ok(value) => value,
        Err(error) => {
          tracing::debug!(%error, name = %item.name, "Term Decode");
          return false;
        }
      },
    };

    self.repr = Repr::Local(Box::new(value));

    true
  }

  /// Returns a copy of the contained value decoded as `T`.
  pub fn decode<T>(&self) -> std::result::Result<T, DecodeError>
  where
    T: Item,
  {
    match self.repr {
      Repr::Local(ref item) => match item.as_any().downcast_ref::<T>() {
        Some(value) => Ok(dyn_clone::clone(value)),
        None => Err(DecodeError::TagMismatch {
          expected: Tag::of::<T>(),
          found: item.tag(),
        }),
      },
      Repr::Encoded(ref item) if item.tag != Tag::of::<T>() => Err(DecodeError::TagMismatch {
        expected: Tag::of::<T>(),
        found: item.tag,
      }),
      Repr::Encoded(ref item) => T::decode_bytes(&item.data),
    }
  }

  /// Converts this term into a value of type `T`.
  ///
  /// Returns the term unchanged if it does not hold a `T`.
  pub fn downcast<T>(mut self) -> std::result::Result<T, Self>
  where
    T: Item,
  {
    if !self.resolve::<T>() {
      return Err(self);
    }

    match self.repr {
      Repr::Local(item) => match item.into_any().downcast::<T>() {
        Ok(value) => Ok(*value),
        Err(_) => raise!(Error, SysInv, "resolved term holds a different type"),
      },
      Repr::Encoded(_) => raise!(Error, SysInv, "resolved term is still encoded"),
    }
  }

  /// Creates a term from a panic payload.
  ///
  /// Raised exceptions are kept as they are; panic messages become strings.
  pub(crate) fn new_error(error: Box<dyn Any + Send>) -> Self {
    let error: Box<dyn Any + Send> = match error.downcast::<Exception>() {
      Ok(exception) => return Self::new(*exception),
      Err(error) => error,
    };

    match error.downcast::<&str>() {
      Ok(error) => Self::new((*error).to_owned()),
      Err(error) => match error.downcast::<String>() {
        Ok(error) => Self::new(*error),
        Err(_) => Self::new(String::from("panic")),
      },
    }
  }

  fn encoded(&self) -> std::result::Result<Encoded, DecodeError> {
    match self.repr {
      Repr::Local(ref item) => Ok(Encoded {
        tag: item.tag(),
        name: item.type_name().to_owned(),
        data: item.encode()?,
      }),
      Repr::Encoded(ref item) => Ok(item.clone()),
    }
  }
}

impl Debug for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self.repr {
      Repr::Local(ref item) => Debug::fmt(&**item, f),
      Repr::Encoded(ref item) => write!(f, "#Term<{}: {} bytes>", item.name, item.data.len()),
    }
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    if let Some(text) = self.downcast_ref::<String>() {
      return f.write_str(text);
    }

    if let Ok(text) = self.decode::<String>() {
      return f.write_str(&text);
    }

    Debug::fmt(self, f)
  }
}

/// Terms compare equal when they hold the same type and encode to the same
/// bytes.
impl PartialEq for Term {
  fn eq(&self, other: &Self) -> bool {
    if self.tag() != other.tag() {
      return false;
    }

    match (self.encoded(), other.encoded()) {
      (Ok(this), Ok(that)) => this.data == that.data,
      _ => false,
    }
  }
}

impl Serialize for Term {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    self
      .encoded()
      .map_err(S::Error::custom)?
      .serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for Term {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(Self {
      repr: Repr::Encoded(Encoded::deserialize(deserializer)?),
    })
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::DecodeError;
  use crate::core::Tag;
  use crate::core::Term;
  use crate::error::Exception;
  use crate::error::ExceptionClass;
  use crate::error::ExceptionGroup;

  fn wire(term: &Term) -> Term {
    postcard::from_bytes(&postcard::to_allocvec(term).unwrap()).unwrap()
  }

  #[test]
  fn test_local_downcast() {
    let term: Term = Term::new(42_u32);

    assert!(term.is::<u32>());
    assert!(!term.is::<i64>());
    assert!(!term.is_encoded());
    assert_eq!(term.downcast_ref::<u32>(), Some(&42));
    assert_eq!(term.downcast::<u32>().unwrap(), 42);
  }

  #[test]
  fn test_wire_stays_encoded_until_resolved() {
    let mut term: Term = wire(&Term::new((7_u8, String::from("ping"))));

    assert!(term.is_encoded());
    assert_eq!(term.tag(), Tag::of::<(u8, String)>());
    assert_eq!(term.downcast_ref::<(u8, String)>(), None);

    assert!(!term.resolve::<String>());
    assert!(term.is_encoded());

    assert!(term.resolve::<(u8, String)>());
    assert!(!term.is_encoded());
    assert_eq!(term.downcast_ref::<(u8, String)>(), Some(&(7, String::from("ping"))));
  }

  #[test]
  fn test_decode_copies_both_forms() {
    let local: Term = Term::new(vec![String::from("a"), String::from("b")]);
    let remote: Term = wire(&local);

    assert_eq!(local.decode::<Vec<String>>().unwrap(), ["a", "b"]);
    assert_eq!(remote.decode::<Vec<String>>().unwrap(), ["a", "b"]);
    assert!(local.is::<Vec<String>>());
    assert!(remote.is_encoded());
  }

  #[test]
  fn test_decode_tag_mismatch() {
    let term: Term = wire(&Term::new(1_u64));
    let error: DecodeError = term.decode::<String>().unwrap_err();

    assert!(matches!(error, DecodeError::TagMismatch { .. }));
  }

  #[test]
  fn test_downcast_returns_term_on_mismatch() {
    let term: Term = Term::new(String::from("x"));
    let term: Term = term.downcast::<u8>().unwrap_err();

    assert_eq!(term.downcast_ref::<String>().map(String::as_str), Some("x"));
  }

  #[test]
  fn test_equality_across_forms() {
    let local: Term = Term::new(vec![1_u16, 2, 3]);
    let remote: Term = wire(&local);

    assert_eq!(local, remote);
    assert_ne!(local, Term::new(vec![1_u16, 2]));
    assert_ne!(local, Term::new(vec![1_u32, 2, 3]));
  }

  #[test]
  fn test_display() {
    assert_eq!(format!("{}", Term::new(String::from("boom"))), "boom");
    assert_eq!(format!("{}", wire(&Term::new(String::from("boom")))), "boom");
    assert_eq!(format!("{}", Term::new(5_i32)), "5");
  }

  #[test]
  fn test_new_error() {
    let term: Term = Term::new_error(Box::new("static"));
    assert_eq!(term.downcast_ref::<String>().map(String::as_str), Some("static"));

    let term: Term = Term::new_error(Box::new(String::from("owned")));
    assert_eq!(term.downcast_ref::<String>().map(String::as_str), Some("owned"));

    let term: Term = Term::new_error(Box::new(5_u8));
    assert_eq!(term.downcast_ref::<String>().map(String::as_str), Some("panic"));

    let exception: Exception = Exception::new(ExceptionClass::Error, ExceptionGroup::SysCap, "full");
    let term: Term = Term::new_error(Box::new(exception.clone()));
    assert_eq!(term.downcast_ref::<Exception>(), Some(&exception));
  }
}
