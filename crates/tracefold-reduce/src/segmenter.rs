//! Content-defined chunking with deduplication against a [`ChunkStore`].
//!
//! Each byte is pushed into a rolling fingerprint and the current chunk
//! buffer. A chunk closes when `fingerprint & boundary_mask == 0` (expected
//! length 256 bytes with the default mask) or at end of input. Closed chunks
//! are digested and either stored (NEW, literal payload) or emitted as a
//! reference to the stored copy (DUPLICATE).
//!
//! Stored content is trusted by digest alone; a digest collision between two
//! different chunks is not detected.

use crate::{
    error::ReduceError,
    fingerprint::{digest, ChunkDigest},
    rolling::{RollingFingerprint, DEFAULT_WINDOW},
    sequence::ByteSequence,
    store::ChunkStore,
};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, instrument};

/// Default boundary mask: cut when the low 8 fingerprint bits are zero
pub const DEFAULT_BOUNDARY_MASK: u64 = 0xFF;

const STREAM_BUF_SIZE: usize = 8 * 1024;

/// Configuration for the content-defined segmenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Rolling fingerprint window in bytes
    pub window_size: usize,
    /// A boundary falls where `fingerprint & boundary_mask == 0`
    pub boundary_mask: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            boundary_mask: DEFAULT_BOUNDARY_MASK,
        }
    }
}

impl SegmenterConfig {
    /// Reject configurations that cannot chunk
    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.window_size == 0 {
            return Err(ReduceError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Expected mean chunk length for random input
    pub fn expected_chunk_len(&self) -> u64 {
        1u64 << self.boundary_mask.count_ones()
    }
}

/// Whether a chunk was stored by this segmentation or already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkStatus {
    /// First occurrence, content carried inline
    New,
    /// Content already in the store, carried by reference
    Duplicate,
}

/// Descriptor payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPayload {
    /// Chunk bytes
    Literal(ByteSequence),
    /// Digest of content held by the store
    Reference(ChunkDigest),
}

/// One entry of a chunk manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    /// Byte offset of this chunk in the original stream
    pub offset: u64,
    /// Chunk length in bytes
    pub length: u64,
    /// NEW or DUPLICATE
    pub status: ChunkStatus,
    /// Literal content for NEW, digest reference for DUPLICATE.
    /// [`reconstruct`] rejects any other pairing.
    pub payload: ChunkPayload,
}

impl ChunkDescriptor {
    /// Descriptor for a chunk stored by this segmentation
    pub fn new_chunk(offset: u64, content: ByteSequence) -> Self {
        Self {
            offset,
            length: content.len() as u64,
            status: ChunkStatus::New,
            payload: ChunkPayload::Literal(content),
        }
    }

    /// Descriptor referencing an already-stored chunk
    pub fn duplicate(offset: u64, length: u64, digest: ChunkDigest) -> Self {
        Self {
            offset,
            length,
            status: ChunkStatus::Duplicate,
            payload: ChunkPayload::Reference(digest),
        }
    }

    /// Content digest (computed for literal payloads)
    pub fn digest(&self) -> ChunkDigest {
        match &self.payload {
            ChunkPayload::Literal(content) => digest(content),
            ChunkPayload::Reference(d) => *d,
        }
    }

    /// True for DUPLICATE descriptors
    pub fn is_duplicate(&self) -> bool {
        self.status == ChunkStatus::Duplicate
    }
}

/// Statistics from a segmentation run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Total input bytes
    pub bytes_in: u64,
    /// Total chunks produced
    pub chunks_total: usize,
    /// Chunks stored by this run
    pub chunks_new: usize,
    /// Chunks found already stored
    pub chunks_duplicate: usize,
    /// Bytes carried inline (NEW chunks)
    pub bytes_new: u64,
    /// Bytes replaced by references
    pub bytes_duplicate: u64,
}

impl SegmentStats {
    /// Dedup ratio (bytes_in / bytes_new)
    pub fn dedup_ratio(&self) -> f64 {
        if self.bytes_new > 0 {
            self.bytes_in as f64 / self.bytes_new as f64
        } else if self.bytes_in > 0 {
            f64::INFINITY
        } else {
            1.0
        }
    }
}

/// Incremental content-defined segmenter bound to one store.
///
/// One instance serves one stream. Several segmenters may share a store
/// across threads.
pub struct Segmenter<'a> {
    store: &'a dyn ChunkStore,
    mask: u64,
    fingerprint: RollingFingerprint,
    buffer: Vec<u8>,
    chunk_start: u64,
    descriptors: Vec<ChunkDescriptor>,
    stats: SegmentStats,
}

impl<'a> Segmenter<'a> {
    /// Validate `config` and start a segmentation against `store`
    pub fn new(store: &'a dyn ChunkStore, config: &SegmenterConfig) -> Result<Self, ReduceError> {
        config.validate()?;
        Ok(Self {
            store,
            mask: config.boundary_mask,
            fingerprint: RollingFingerprint::new(config.window_size),
            buffer: Vec::new(),
            chunk_start: 0,
            descriptors: Vec::new(),
            stats: SegmentStats::default(),
        })
    }

    /// Feed bytes, closing chunks at every boundary found
    pub fn write(&mut self, data: &[u8]) {
        for &b in data {
            self.fingerprint.push_byte(b);
            self.buffer.push(b);
            if self.fingerprint.value() & self.mask == 0 {
                self.close_chunk();
            }
        }
        self.stats.bytes_in += data.len() as u64;
    }

    /// Close the trailing chunk and return the manifest
    pub fn finish(mut self) -> (Vec<ChunkDescriptor>, SegmentStats) {
        if !self.buffer.is_empty() {
            self.close_chunk();
        }
        (self.descriptors, self.stats)
    }

    fn close_chunk(&mut self) {
        let content = ByteSequence::from(std::mem::take(&mut self.buffer));
        let length = content.len() as u64;
        let d = digest(&content);
        let descriptor = if self.store.insert_if_absent(d, content.clone()) {
            self.stats.chunks_new += 1;
            self.stats.bytes_new += length;
            ChunkDescriptor::new_chunk(self.chunk_start, content)
        } else {
            self.stats.chunks_duplicate += 1;
            self.stats.bytes_duplicate += length;
            debug!(offset = self.chunk_start, length, digest = %d, "duplicate chunk");
            ChunkDescriptor::duplicate(self.chunk_start, length, d)
        };
        self.stats.chunks_total += 1;
        self.descriptors.push(descriptor);
        self.chunk_start += length;
        self.fingerprint.reset();
    }
}

/// Segment a buffer against `store`
#[instrument(skip(data, store, config), fields(input_bytes = data.len()))]
pub fn segment(
    data: &[u8],
    store: &dyn ChunkStore,
    config: &SegmenterConfig,
) -> Result<(Vec<ChunkDescriptor>, SegmentStats), ReduceError> {
    let mut segmenter = Segmenter::new(store, config)?;
    segmenter.write(data);
    let (descriptors, stats) = segmenter.finish();
    debug!(
        chunks = stats.chunks_total,
        new = stats.chunks_new,
        duplicate = stats.chunks_duplicate,
        "buffer segmented"
    );
    Ok((descriptors, stats))
}

/// Segment everything readable from `source` against `store`
#[instrument(skip_all)]
pub fn segment_stream<R: Read>(
    mut source: R,
    store: &dyn ChunkStore,
    config: &SegmenterConfig,
) -> Result<(Vec<ChunkDescriptor>, SegmentStats), ReduceError> {
    let mut segmenter = Segmenter::new(store, config)?;
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => segmenter.write(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let (descriptors, stats) = segmenter.finish();
    debug!(
        bytes = stats.bytes_in,
        chunks = stats.chunks_total,
        duplicate = stats.chunks_duplicate,
        "stream segmented"
    );
    Ok((descriptors, stats))
}

/// Write the original stream described by `descriptors` into `sink`.
/// Returns the number of bytes written.
#[instrument(skip_all, fields(chunks = descriptors.len()))]
pub fn reconstruct_into<W: Write>(
    descriptors: &[ChunkDescriptor],
    store: &dyn ChunkStore,
    sink: &mut W,
) -> Result<u64, ReduceError> {
    let mut position = 0u64;
    for desc in descriptors {
        if desc.offset != position {
            return Err(ReduceError::OffsetMismatch {
                expected: position,
                found: desc.offset,
            });
        }
        let content = match (desc.status, &desc.payload) {
            (ChunkStatus::New, ChunkPayload::Literal(content)) => content.clone(),
            (ChunkStatus::Duplicate, ChunkPayload::Reference(d)) => {
                store.get(d).ok_or(ReduceError::MissingChunk(*d))?
            }
            (status, _) => {
                return Err(ReduceError::StatusMismatch {
                    offset: desc.offset,
                    status,
                })
            }
        };
        if content.len() as u64 != desc.length {
            return Err(ReduceError::LengthMismatch {
                offset: desc.offset,
                expected: desc.length,
                actual: content.len() as u64,
            });
        }
        sink.write_all(&content)?;
        position += desc.length;
    }
    sink.flush()?;
    Ok(position)
}

const RECONSTRUCT_PREALLOC_LIMIT: u64 = 64 * 1024 * 1024;

/// Rebuild the original buffer from a manifest
pub fn reconstruct(
    descriptors: &[ChunkDescriptor],
    store: &dyn ChunkStore,
) -> Result<Vec<u8>, ReduceError> {
    // lengths are untrusted until reconstruct_into checks them
    let hint = descriptors
        .iter()
        .try_fold(0u64, |acc, d| acc.checked_add(d.length))
        .unwrap_or(0)
        .min(RECONSTRUCT_PREALLOC_LIMIT);
    let mut out = Vec::with_capacity(hint as usize);
    reconstruct_into(descriptors, store, &mut out)?;
    Ok(out)
}
