use serde::Deserialize;
use serde::Serialize;
use std::any;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Type tag consulted by selective receive before decoding a payload.
///
/// Tags are the 64-bit FNV-1a hash of the payload's type name.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Tag {
  bits: u64,
}

impl Tag {
  /// Returns the tag of `T`.
  #[inline]
  pub fn of<T>() -> Self
  where
    T: ?Sized + 'static,
  {
    Self::from_name(any::type_name::<T>())
  }

  /// Returns the tag for an explicit type name.
  pub const fn from_name(name: &str) -> Self {
    let bytes: &[u8] = name.as_bytes();
    let mut hash: u64 = FNV_OFFSET;
    let mut index: usize = 0;

    while index < bytes.len() {
      hash ^= bytes[index] as u64;
      hash = hash.wrapping_mul(FNV_PRIME);
      index += 1;
    }

    Self { bits: hash }
  }

  /// Returns the raw tag bits.
  #[inline]
  pub const fn into_bits(self) -> u64 {
    self.bits
  }
}

impl Debug for Tag {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "Tag({:#018x})", self.bits)
  }
}

impl Display for Tag {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "{:#018x}", self.bits)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::core::Tag;

  #[test]
  fn test_fnv_reference_values() {
    assert_eq!(Tag::from_name("").into_bits(), 0xcbf2_9ce4_8422_2325);
    assert_eq!(Tag::from_name("a").into_bits(), 0xaf63_dc4c_8601_ec8c);
  }

  #[test]
  fn test_distinct_types() {
    assert_eq!(Tag::of::<String>(), Tag::of::<String>());
    assert_ne!(Tag::of::<String>(), Tag::of::<u32>());
    assert_ne!(Tag::of::<(u32, String)>(), Tag::of::<(String, u32)>());
  }
}
