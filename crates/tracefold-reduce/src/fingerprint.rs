//! Content digests: 128-bit BLAKE3 used as the chunk store key

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Digest length in bytes
pub const DIGEST_LEN: usize = 16;

/// A 128-bit BLAKE3 digest identifying a chunk's content. Used as the CAS key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkDigest(pub [u8; DIGEST_LEN]);

impl ChunkDigest {
    /// Return the digest as a lowercase hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 32-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != DIGEST_LEN * 2 || !s.is_ascii() {
            return None;
        }
        let mut out = [0u8; DIGEST_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(out))
    }

    /// Return the raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkDigest({})", self.to_hex())
    }
}

impl Serialize for ChunkDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChunkDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChunkDigest::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid chunk digest: {s}")))
    }
}

/// Compute the 128-bit BLAKE3 digest of data (first 16 bytes of the XOF output)
pub fn digest(data: &[u8]) -> ChunkDigest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    let mut out = [0u8; DIGEST_LEN];
    hasher.finalize_xof().fill(&mut out);
    ChunkDigest(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest(b"hello world"), digest(b"hello world"));
    }

    #[test]
    fn different_data_produces_different_digests() {
        assert_ne!(digest(b"hello"), digest(b"world"));
    }

    #[test]
    fn digest_is_prefix_of_blake3() {
        let full = blake3::hash(b"abc");
        assert_eq!(&digest(b"abc").0[..], &full.as_bytes()[..DIGEST_LEN]);
    }

    #[test]
    fn hex_roundtrip() {
        let d = digest(b"chunk");
        let hex = d.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(ChunkDigest::from_hex(&hex), Some(d));
        assert_eq!(ChunkDigest::from_hex("zz"), None);
        assert_eq!(ChunkDigest::from_hex(&"g".repeat(32)), None);
    }

    #[test]
    fn serializes_as_hex_string() {
        let d = digest(b"x");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: ChunkDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    proptest! {
        #[test]
        fn prop_digest_deterministic(data in prop::collection::vec(0u8..=255, 0..10_000)) {
            prop_assert_eq!(digest(&data), digest(&data));
        }
    }
}
