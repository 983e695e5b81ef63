//! Prometheus-compatible metrics for the tracefold reduction engines.
//!
//! Atomic counters for codec sessions and chunking runs. Sessions report
//! their [`CodecStats`] / [`SegmentStats`] here once they finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::CodecStats;
use crate::segmenter::SegmentStats;

/// The type of metric: counter or gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up or down.
    Gauge,
}

/// The value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter value.
    Counter(u64),
    /// A gauge value.
    Gauge(f64),
}

/// A single metric with metadata and value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceMetric {
    /// The metric name.
    pub name: String,
    /// Help text describing the metric.
    pub help: String,
    /// The kind of metric.
    pub kind: MetricKind,
    /// The metric value.
    pub value: MetricValue,
}

/// Thread-safe counters shared by every codec and segmenter session.
#[derive(Debug, Default)]
pub struct ReductionMetrics {
    compress_sessions: AtomicU64,
    compress_bytes_in: AtomicU64,
    compress_bytes_out: AtomicU64,
    codes_emitted: AtomicU64,
    dictionary_saturations: AtomicU64,
    decompress_sessions: AtomicU64,
    decompress_bytes_out: AtomicU64,
    segment_bytes_in: AtomicU64,
    chunks_new: AtomicU64,
    chunks_duplicate: AtomicU64,
    bytes_new: AtomicU64,
    bytes_duplicate: AtomicU64,
}

impl ReductionMetrics {
    /// Create a new ReductionMetrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished compression session.
    #[inline]
    pub fn record_compress(&self, stats: &CodecStats) {
        self.compress_sessions.fetch_add(1, Ordering::Relaxed);
        self.compress_bytes_in
            .fetch_add(stats.raw_bytes, Ordering::Relaxed);
        self.compress_bytes_out
            .fetch_add(stats.packed_bytes, Ordering::Relaxed);
        self.codes_emitted.fetch_add(stats.codes, Ordering::Relaxed);
        if stats.saturated {
            self.dictionary_saturations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a finished decompression session.
    #[inline]
    pub fn record_decompress(&self, stats: &CodecStats) {
        self.decompress_sessions.fetch_add(1, Ordering::Relaxed);
        self.decompress_bytes_out
            .fetch_add(stats.raw_bytes, Ordering::Relaxed);
    }

    /// Record a finished segmentation run.
    #[inline]
    pub fn record_segment(&self, stats: &SegmentStats) {
        self.segment_bytes_in
            .fetch_add(stats.bytes_in, Ordering::Relaxed);
        self.chunks_new
            .fetch_add(stats.chunks_new as u64, Ordering::Relaxed);
        self.chunks_duplicate
            .fetch_add(stats.chunks_duplicate as u64, Ordering::Relaxed);
        self.bytes_new.fetch_add(stats.bytes_new, Ordering::Relaxed);
        self.bytes_duplicate
            .fetch_add(stats.bytes_duplicate, Ordering::Relaxed);
    }

    /// Duplicate chunks over all chunks; 0.0 before any chunking.
    pub fn dedup_ratio(&self) -> f64 {
        let dup = self.chunks_duplicate.load(Ordering::Relaxed);
        let total = dup + self.chunks_new.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            dup as f64 / total as f64
        }
    }

    /// Compression ratio (bytes_in / bytes_out); 1.0 before any compression.
    pub fn compression_ratio(&self) -> f64 {
        let bytes_in = self.compress_bytes_in.load(Ordering::Relaxed);
        let bytes_out = self.compress_bytes_out.load(Ordering::Relaxed);
        if bytes_out == 0 {
            1.0
        } else {
            bytes_in as f64 / bytes_out as f64
        }
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            compress_sessions: self.compress_sessions.load(Ordering::Relaxed),
            compress_bytes_in: self.compress_bytes_in.load(Ordering::Relaxed),
            compress_bytes_out: self.compress_bytes_out.load(Ordering::Relaxed),
            codes_emitted: self.codes_emitted.load(Ordering::Relaxed),
            dictionary_saturations: self.dictionary_saturations.load(Ordering::Relaxed),
            decompress_sessions: self.decompress_sessions.load(Ordering::Relaxed),
            decompress_bytes_out: self.decompress_bytes_out.load(Ordering::Relaxed),
            segment_bytes_in: self.segment_bytes_in.load(Ordering::Relaxed),
            chunks_new: self.chunks_new.load(Ordering::Relaxed),
            chunks_duplicate: self.chunks_duplicate.load(Ordering::Relaxed),
            bytes_new: self.bytes_new.load(Ordering::Relaxed),
            bytes_duplicate: self.bytes_duplicate.load(Ordering::Relaxed),
            dedup_ratio: self.dedup_ratio(),
            compression_ratio: self.compression_ratio(),
        }
    }

    /// Collect all metrics with Prometheus-style names and help text.
    pub fn collect(&self) -> Vec<ReduceMetric> {
        let s = self.snapshot();
        let counter = |name: &str, help: &str, v: u64| ReduceMetric {
            name: format!("tracefold_reduce_{name}"),
            help: help.to_string(),
            kind: MetricKind::Counter,
            value: MetricValue::Counter(v),
        };
        let gauge = |name: &str, help: &str, v: f64| ReduceMetric {
            name: format!("tracefold_reduce_{name}"),
            help: help.to_string(),
            kind: MetricKind::Gauge,
            value: MetricValue::Gauge(v),
        };
        vec![
            counter("compress_sessions_total", "Completed compression sessions", s.compress_sessions),
            counter("compress_bytes_in_total", "Raw bytes fed to the LZW encoder", s.compress_bytes_in),
            counter("compress_bytes_out_total", "Framed bytes produced by the LZW encoder", s.compress_bytes_out),
            counter("codes_emitted_total", "Fixed-width codes written", s.codes_emitted),
            counter(
                "dictionary_saturations_total",
                "Compression sessions whose dictionary reached capacity",
                s.dictionary_saturations,
            ),
            counter("decompress_sessions_total", "Completed decompression sessions", s.decompress_sessions),
            counter("decompress_bytes_out_total", "Bytes produced by the LZW decoder", s.decompress_bytes_out),
            counter("segment_bytes_in_total", "Bytes scanned by the segmenter", s.segment_bytes_in),
            counter("chunks_new_total", "Chunks stored for the first time", s.chunks_new),
            counter("chunks_duplicate_total", "Chunks replaced by a store reference", s.chunks_duplicate),
            counter("bytes_new_total", "Bytes carried inline in NEW chunks", s.bytes_new),
            counter("bytes_duplicate_total", "Bytes replaced by references", s.bytes_duplicate),
            gauge("dedup_ratio", "Duplicate chunks / all chunks", s.dedup_ratio),
            gauge("compression_ratio", "Compression ratio (bytes_in / bytes_out)", s.compression_ratio),
        ]
    }
}

/// A shareable handle on one set of [`ReductionMetrics`].
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle {
    inner: Arc<ReductionMetrics>,
}

impl MetricsHandle {
    /// Create a handle on fresh metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference to the underlying ReductionMetrics.
    pub fn metrics(&self) -> Arc<ReductionMetrics> {
        Arc::clone(&self.inner)
    }

    /// Take a point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.snapshot()
    }
}

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Completed compression sessions.
    pub compress_sessions: u64,
    /// Raw bytes fed to the encoder.
    pub compress_bytes_in: u64,
    /// Framed bytes produced by the encoder.
    pub compress_bytes_out: u64,
    /// Codes written.
    pub codes_emitted: u64,
    /// Sessions that saturated their dictionary.
    pub dictionary_saturations: u64,
    /// Completed decompression sessions.
    pub decompress_sessions: u64,
    /// Bytes produced by the decoder.
    pub decompress_bytes_out: u64,
    /// Bytes scanned by the segmenter.
    pub segment_bytes_in: u64,
    /// NEW chunks.
    pub chunks_new: u64,
    /// DUPLICATE chunks.
    pub chunks_duplicate: u64,
    /// Bytes in NEW chunks.
    pub bytes_new: u64,
    /// Bytes in DUPLICATE chunks.
    pub bytes_duplicate: u64,
    /// Duplicate chunk ratio.
    pub dedup_ratio: f64,
    /// Compression ratio.
    pub compression_ratio: f64,
}
