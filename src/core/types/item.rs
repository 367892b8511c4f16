//! Trait defining type-erased runtime values usable within [`Term`].
//!
//! Most users will work with [`Term`] directly rather than implementing
//! [`Item`] manually.
//!
//! [`Term`]: crate::core::Term

use dyn_clone::DynClone;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any;
use std::any::Any;
use std::fmt::Debug;

use crate::core::DecodeError;
use crate::core::Tag;

/// Trait implemented by all values stored inside a [`Term`].
///
/// # Automatic Implementation
///
/// [`Item`] is automatically implemented for all types that satisfy:
///
/// - [`Clone`]: Required for cloning trait objects
/// - [`Debug`]: Required for diagnostic output
/// - [`Send`] + [`Sync`]: Required for inter-process communication
/// - [`Serialize`] + [`DeserializeOwned`]: Required to cross a node boundary
/// - `'static`: Required for type erasure
///
/// # Examples
///
/// ```
/// use tarazed::core::Term;
///
/// // These types automatically implement Item:
/// let t1 = Term::new(42_i32);
/// let t2 = Term::new(String::from("hello"));
/// let t3 = Term::new(vec![1, 2, 3]);
/// ```
///
/// [`Term`]: crate::core::Term
pub trait Item: Any + Debug + DynClone + Send + Sync + 'static {
  /// Returns a shared reference to this value as [`Any`].
  fn as_any(&self) -> &(dyn Any + Send + Sync);

  /// Returns a mutable reference to this value as [`Any`].
  fn as_mut_any(&mut self) -> &mut (dyn Any + Send + Sync);

  /// Converts this value into a boxed [`Any`] trait object.
  fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

  /// Returns the stable type tag of this value.
  fn tag(&self) -> Tag;

  /// Returns the type name of this value.
  fn type_name(&self) -> &'static str;

  /// Encodes this value for transmission to another node.
  fn encode(&self) -> Result<Vec<u8>, DecodeError>;

  /// Decodes a value of this type from bytes produced by [`encode()`].
  ///
  /// [`encode()`]: Self::encode
  fn decode_bytes(data: &[u8]) -> Result<Self, DecodeError>
  where
    Self: Sized;
}

dyn_clone::clone_trait_object!(Item);

impl<T> Item for T
where
  T: Clone + Debug + Send + Sync + 'static,
  T: Serialize + DeserializeOwned,
{
  #[inline]
  fn as_any(&self) -> &(dyn Any + Send + Sync) {
    self
  }

  #[inline]
  fn as_mut_any(&mut self) -> &mut (dyn Any + Send + Sync) {
    self
  }

  #[inline]
  fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
    self
  }

  #[inline]
  fn tag(&self) -> Tag {
    Tag::of::<T>()
  }

  #[inline]
  fn type_name(&self) -> &'static str {
    any::type_name::<T>()
  }

  #[inline]
  fn encode(&self) -> Result<Vec<u8>, DecodeError> {
    postcard::to_allocvec(self).map_err(DecodeError::Encode)
  }

  #[inline]
  fn decode_bytes(data: &[u8]) -> Result<Self, DecodeError> {
    postcard::from_bytes(data).map_err(DecodeError::Decode)
  }
}
