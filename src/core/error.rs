use thiserror::Error;

use crate::core::Tag;

/// Errors produced when a payload crosses the serialization boundary.
///
/// Selective receive never surfaces these to a process; a payload that
/// fails to decode is treated as non-matching.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
  /// The payload carries a different type tag.
  #[error("tag mismatch (expected {expected}, found {found})")]
  TagMismatch { expected: Tag, found: Tag },
  /// The value could not be encoded.
  #[error("encode failed: {0}")]
  Encode(#[source] postcard::Error),
  /// The bytes could not be decoded into the requested type.
  #[error("decode failed: {0}")]
  Decode(#[source] postcard::Error),
}
