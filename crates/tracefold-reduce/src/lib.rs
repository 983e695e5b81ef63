#![warn(missing_docs)]

//! Tracefold reduction subsystem: LZW codec (7-bit framed), content-defined chunking, dedupe store
//!
//! Codec path:    Data → LZW encode (BoundedCodeDictionary) → BitWriter → framed bytes
//! Chunking path: Data → RollingFingerprint boundaries → Digest (BLAKE3-128) → ChunkStore → manifest
//!
//! The two paths are independent and can be composed, e.g. compressing the
//! literal content of NEW chunks.

pub mod bitio;
pub mod codec;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod rolling;
pub mod segmenter;
pub mod sequence;
pub mod store;

pub use bitio::{BitReader, BitWriter};
pub use codec::{
    compress, compress_stream, decompress, decompress_stream, CodecConfig, CodecStats, LzwDecoder,
    LzwEncoder,
};
pub use config::ReduceConfig;
pub use dictionary::{BoundedCodeDictionary, Code, CodeDictionary, Namespace, PhraseTable, PRIMED_OFFSET};
pub use error::ReduceError;
pub use fingerprint::{digest, ChunkDigest};
pub use metrics::{MetricKind, MetricValue, MetricsHandle, MetricsSnapshot, ReduceMetric, ReductionMetrics};
pub use rolling::RollingFingerprint;
pub use segmenter::{
    reconstruct, reconstruct_into, segment, segment_stream, ChunkDescriptor, ChunkPayload,
    ChunkStatus, SegmentStats, Segmenter, SegmenterConfig,
};
pub use sequence::ByteSequence;
pub use store::{ChunkStore, ConcurrentChunkStore, LockedChunkStore, StoreSnapshot};
