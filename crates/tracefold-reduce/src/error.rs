//! Error types for the tracefold-reduce subsystem

use crate::fingerprint::ChunkDigest;
use crate::segmenter::ChunkStatus;

/// All errors that can occur during codec and chunking operations
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// Operation not permitted in the current state (e.g. write after close)
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Compressed stream could not be decoded (corrupt data or width mismatch)
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),
    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// A duplicate descriptor references a digest the store does not hold
    #[error("Missing chunk data for digest {0}")]
    MissingChunk(ChunkDigest),
    /// Descriptor length disagrees with the content it resolves to
    #[error("Chunk at offset {offset}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Descriptor offset
        offset: u64,
        /// Length the descriptor claims
        expected: u64,
        /// Length of the resolved content
        actual: u64,
    },
    /// Descriptor status disagrees with its payload kind
    #[error("Chunk at offset {offset}: status {status:?} does not match payload")]
    StatusMismatch {
        /// Descriptor offset
        offset: u64,
        /// Status the descriptor claims
        status: ChunkStatus,
    },
    /// Descriptors are not contiguous
    #[error("Chunk offset {found} does not follow previous chunk ending at {expected}")]
    OffsetMismatch {
        /// Position where the next chunk should start
        expected: u64,
        /// Offset the descriptor claims
        found: u64,
    },
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
