//! End-to-end tests for tracefold-reduce through its public API.

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use tracefold_reduce::{
    compress, decompress, digest, reconstruct, segment, ByteSequence, ChunkDescriptor,
    ChunkPayload, ChunkStatus, ChunkStore, CodecConfig, ConcurrentChunkStore, LockedChunkStore,
    ReductionMetrics, SegmenterConfig,
};

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// JSON-ish trace payload with lots of repetition.
fn trace_payload(spans: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..spans {
        out.extend_from_slice(
            format!(
                "{{\"span\":{},\"name\":\"http.request\",\"status\":200,\"duration_ms\":{}}}\n",
                i,
                i % 17
            )
            .as_bytes(),
        );
    }
    out
}

#[test]
fn codec_roundtrips_trace_payload() {
    let config = CodecConfig::default();
    let data = trace_payload(2_000);
    let packed = compress(&data, &config).unwrap();
    assert!(packed.len() < data.len() / 2);
    assert_eq!(decompress(&packed, &config).unwrap(), data);
}

#[test]
fn codec_roundtrips_past_dictionary_capacity() {
    let config = CodecConfig::default();
    // far more distinct phrases than 4096 codes
    let data = random_bytes(11, 200_000);
    let packed = compress(&data, &config).unwrap();
    assert_eq!(decompress(&packed, &config).unwrap(), data);
}

#[test]
fn segment_then_compress_new_chunks() {
    let store = ConcurrentChunkStore::new();
    let codec = CodecConfig::default();
    let data = [trace_payload(300), trace_payload(300)].concat();
    let (descs, stats) = segment(&data, &store, &SegmenterConfig::default()).unwrap();
    assert!(stats.chunks_duplicate > 0);

    // ship NEW chunks compressed, then undo on the receiving side
    let shipped: Vec<(ChunkDescriptor, Option<Vec<u8>>)> = descs
        .iter()
        .map(|d| match &d.payload {
            ChunkPayload::Literal(c) => (d.clone(), Some(compress(c, &codec).unwrap())),
            ChunkPayload::Reference(_) => (d.clone(), None),
        })
        .collect();
    let received: Vec<ChunkDescriptor> = shipped
        .into_iter()
        .map(|(mut d, packed)| {
            if let Some(p) = packed {
                d.payload = ChunkPayload::Literal(ByteSequence::from(decompress(&p, &codec).unwrap()));
            }
            d
        })
        .collect();
    assert_eq!(reconstruct(&received, &store).unwrap(), data);
}

#[test]
fn concurrent_segmenters_share_one_store() {
    let store: Arc<dyn ChunkStore> = Arc::new(ConcurrentChunkStore::new());
    let config = SegmenterConfig::default();
    let data = random_bytes(21, 100_000);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let data = &data;
                let config = &config;
                s.spawn(move || segment(data, store.as_ref(), config).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // every distinct chunk was stored exactly once across all threads
    let distinct: std::collections::HashSet<_> =
        results[0].0.iter().map(|d| d.digest()).collect();
    assert_eq!(store.len(), distinct.len());
    let total_new: usize = results.iter().map(|(_, s)| s.chunks_new).sum();
    assert_eq!(total_new, distinct.len());
    for (descs, _) in &results {
        assert_eq!(reconstruct(descs, store.as_ref()).unwrap(), data);
    }
}

#[test]
fn locked_store_behaves_like_concurrent_store() {
    let config = SegmenterConfig::default();
    let data = [random_bytes(31, 30_000), random_bytes(31, 30_000)].concat();
    let a = ConcurrentChunkStore::new();
    let b = LockedChunkStore::new();
    let (da, _) = segment(&data, &a, &config).unwrap();
    let (db, _) = segment(&data, &b, &config).unwrap();
    assert_eq!(da, db);
    assert_eq!(a.snapshot(), b.snapshot());
    assert!(da.iter().any(|d| d.status == ChunkStatus::Duplicate));
}

#[test]
fn store_keeps_first_seen_content() {
    let store = ConcurrentChunkStore::new();
    let (descs, _) = segment(b"payload", &store, &SegmenterConfig::default()).unwrap();
    let d = descs[0].digest();
    assert_eq!(d, digest(b"payload"));
    assert!(!store.insert_if_absent(d, ByteSequence::from("other")));
    assert_eq!(store.get(&d), Some(ByteSequence::from("payload")));
}

#[test]
fn metrics_track_sessions() {
    let metrics = ReductionMetrics::new();
    let store = ConcurrentChunkStore::new();
    let data = trace_payload(100);
    let (_, stats) = segment(&data, &store, &SegmenterConfig::default()).unwrap();
    metrics.record_segment(&stats);
    let snap = metrics.snapshot();
    assert_eq!(snap.segment_bytes_in, data.len() as u64);
    assert_eq!(snap.chunks_new + snap.chunks_duplicate, stats.chunks_total as u64);
}

proptest! {
    #[test]
    fn prop_segment_reconstruct_with_prefilled_store(
        a in prop::collection::vec(any::<u8>(), 0..20_000),
        b in prop::collection::vec(any::<u8>(), 0..20_000),
    ) {
        let store = LockedChunkStore::new();
        let config = SegmenterConfig::default();
        segment(&a, &store, &config).unwrap();
        let (descs, _) = segment(&b, &store, &config).unwrap();
        prop_assert_eq!(reconstruct(&descs, &store).unwrap(), b);
    }

    #[test]
    fn prop_codec_roundtrip_text(s in "[a-e ]{0,3000}") {
        let config = CodecConfig::default();
        let packed = compress(s.as_bytes(), &config).unwrap();
        prop_assert_eq!(decompress(&packed, &config).unwrap(), s.as_bytes());
    }
}
