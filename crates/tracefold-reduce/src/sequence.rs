//! Immutable byte sequences used as dictionary keys and chunk content carriers

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::{Deref, RangeBounds};

/// An ordered, immutable run of bytes with structural equality and hashing.
///
/// Backed by [`Bytes`], so clones and slices share the underlying buffer.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteSequence(Bytes);

impl ByteSequence {
    /// The empty sequence
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Sequence holding a single byte
    pub fn single(byte: u8) -> Self {
        Self(Bytes::copy_from_slice(&[byte]))
    }

    /// Copy a slice into a new sequence
    pub fn from_slice(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    /// New sequence holding `self` followed by `other`
    pub fn concat(&self, other: &[u8]) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut buf = BytesMut::with_capacity(self.0.len() + other.len());
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(other);
        Self(buf.freeze())
    }

    /// New sequence holding `self` followed by one byte
    pub fn append_byte(&self, byte: u8) -> Self {
        self.concat(&[byte])
    }

    /// Sub-sequence sharing this sequence's buffer
    ///
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        Self(self.0.slice(range))
    }

    /// First byte, if any
    pub fn first(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the sequence holds no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap into the backing buffer
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for ByteSequence {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteSequence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for ByteSequence {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteSequence {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<&[u8]> for ByteSequence {
    fn from(s: &[u8]) -> Self {
        Self::from_slice(s)
    }
}

impl From<&str> for ByteSequence {
    fn from(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

impl From<Bytes> for ByteSequence {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl fmt::Debug for ByteSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSequence({:?})", self.0)
    }
}

impl Serialize for ByteSequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_bytes::Bytes::new(&self.0).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ByteSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let buf = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Ok(Self::from(buf.into_vec()))
    }
}
