//! Content-addressed chunk store: digest → first-seen content.
//!
//! Entries are never replaced or removed; the store only grows. Every
//! implementation must make `insert_if_absent` atomic so that concurrent
//! segmenters sharing one store keep at most one copy per digest.

use crate::fingerprint::ChunkDigest;
use crate::sequence::ByteSequence;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Storage backend for deduplicated chunks.
/// Object-safe and shareable across threads.
pub trait ChunkStore: Send + Sync {
    /// Content stored under `digest`
    fn get(&self, digest: &ChunkDigest) -> Option<ByteSequence>;

    /// True if `digest` is present
    fn contains(&self, digest: &ChunkDigest) -> bool {
        self.get(digest).is_some()
    }

    /// Store `content` under `digest` unless the digest is already present.
    /// Returns true if this call stored it. Check and insert are one atomic step.
    fn insert_if_absent(&self, digest: ChunkDigest, content: ByteSequence) -> bool;

    /// Number of distinct digests stored
    fn len(&self) -> usize;

    /// True if nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of stored content lengths
    fn stored_bytes(&self) -> u64;

    /// Copy of every entry, sorted by digest
    fn snapshot(&self) -> StoreSnapshot;
}

/// Serializable copy of a store's contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// (digest, content) pairs
    pub entries: Vec<(ChunkDigest, ByteSequence)>,
}

impl StoreSnapshot {
    /// Load every entry into `store`, keeping anything already there
    pub fn restore_into(self, store: &dyn ChunkStore) -> usize {
        self.entries
            .into_iter()
            .filter(|(d, c)| store.insert_if_absent(*d, c.clone()))
            .count()
    }
}

/// Lock-striped store on a concurrent hash map
#[derive(Debug, Default)]
pub struct ConcurrentChunkStore {
    entries: DashMap<ChunkDigest, ByteSequence>,
}

impl ConcurrentChunkStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for ConcurrentChunkStore {
    fn get(&self, digest: &ChunkDigest) -> Option<ByteSequence> {
        self.entries.get(digest).map(|e| e.value().clone())
    }

    fn contains(&self, digest: &ChunkDigest) -> bool {
        self.entries.contains_key(digest)
    }

    fn insert_if_absent(&self, digest: ChunkDigest, content: ByteSequence) -> bool {
        match self.entries.entry(digest) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(%digest, len = content.len(), "stored new chunk");
                slot.insert(content);
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stored_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.value().len() as u64).sum()
    }

    fn snapshot(&self) -> StoreSnapshot {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        StoreSnapshot { entries }
    }
}

/// Store on a single read/write-locked map
#[derive(Debug, Default)]
pub struct LockedChunkStore {
    entries: RwLock<HashMap<ChunkDigest, ByteSequence>>,
}

impl LockedChunkStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for LockedChunkStore {
    fn get(&self, digest: &ChunkDigest) -> Option<ByteSequence> {
        self.entries.read().get(digest).cloned()
    }

    fn contains(&self, digest: &ChunkDigest) -> bool {
        self.entries.read().contains_key(digest)
    }

    fn insert_if_absent(&self, digest: ChunkDigest, content: ByteSequence) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&digest) {
            return false;
        }
        debug!(%digest, len = content.len(), "stored new chunk");
        entries.insert(digest, content);
        true
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn stored_bytes(&self) -> u64 {
        self.entries.read().values().map(|c| c.len() as u64).sum()
    }

    fn snapshot(&self) -> StoreSnapshot {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(d, c)| (*d, c.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        StoreSnapshot { entries }
    }
}
