//! Command-line surface: file-level compress, segment and reconstruct commands

use crate::config;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracefold_reduce::{
    compress_stream, decompress_stream, reconstruct_into, segment_stream, ChunkDescriptor,
    ChunkPayload, ChunkStore, ConcurrentChunkStore, LzwDecoder, LzwEncoder, MetricsHandle,
    MetricsSnapshot, ReduceConfig, StoreSnapshot,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tracefold")]
#[command(about = "Tracefold payload reduction CLI", long_about = None)]
pub struct Cli {
    /// Codec/segmenter config file (.toml or .json)
    #[arg(short, long, env = "TRACEFOLD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// LZW-compress a file
    Compress { input: PathBuf, output: PathBuf },
    /// Decompress a file produced by `compress` with the same config
    Decompress { input: PathBuf, output: PathBuf },
    /// Chunk a file and deduplicate against a store file
    Segment {
        input: PathBuf,
        /// Manifest output (JSON)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Store file (JSON); created if missing, updated in place
        #[arg(short, long)]
        store: PathBuf,
    },
    /// Rebuild a file from a manifest and store
    Reconstruct {
        #[arg(short, long)]
        manifest: PathBuf,
        #[arg(short, long)]
        store: PathBuf,
        output: PathBuf,
    },
    /// Segment and compress a file in memory and print metrics
    Stats { input: PathBuf },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = config::load(self.config.as_deref())?;
        match self.command {
            Command::Compress { input, output } => run_compress(&config, &input, &output),
            Command::Decompress { input, output } => run_decompress(&config, &input, &output),
            Command::Segment {
                input,
                manifest,
                store,
            } => run_segment(&config, &input, &manifest, &store),
            Command::Reconstruct {
                manifest,
                store,
                output,
            } => run_reconstruct(&manifest, &store, &output),
            Command::Stats { input } => run_stats(&config, &input),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(f))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(f))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = create(path)?;
    serde_json::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn load_store(path: &Path) -> Result<ConcurrentChunkStore> {
    let store = ConcurrentChunkStore::new();
    if path.exists() {
        let snapshot: StoreSnapshot = serde_json::from_reader(open(path)?)
            .with_context(|| format!("parsing store {}", path.display()))?;
        let loaded = snapshot.restore_into(&store);
        info!(entries = loaded, "store loaded");
    }
    Ok(store)
}

fn run_compress(config: &ReduceConfig, input: &Path, output: &Path) -> Result<()> {
    let stats = compress_stream(open(input)?, create(output)?, &config.codec)?;
    info!(
        raw = stats.raw_bytes,
        packed = stats.packed_bytes,
        ratio = stats.ratio(),
        saturated = stats.saturated,
        "compressed"
    );
    Ok(())
}

fn run_decompress(config: &ReduceConfig, input: &Path, output: &Path) -> Result<()> {
    let stats = decompress_stream(open(input)?, create(output)?, &config.codec)?;
    info!(raw = stats.raw_bytes, packed = stats.packed_bytes, "decompressed");
    Ok(())
}

fn run_segment(config: &ReduceConfig, input: &Path, manifest: &Path, store_path: &Path) -> Result<()> {
    let store = load_store(store_path)?;
    let (descriptors, stats) = segment_stream(open(input)?, &store, &config.segmenter)?;
    write_json(manifest, &descriptors)?;
    write_json(store_path, &store.snapshot())?;
    info!(
        chunks = stats.chunks_total,
        new = stats.chunks_new,
        duplicate = stats.chunks_duplicate,
        dedup_ratio = stats.dedup_ratio(),
        "segmented"
    );
    Ok(())
}

fn run_reconstruct(manifest: &Path, store_path: &Path, output: &Path) -> Result<()> {
    let descriptors: Vec<ChunkDescriptor> = serde_json::from_reader(open(manifest)?)
        .with_context(|| format!("parsing manifest {}", manifest.display()))?;
    let store = load_store(store_path)?;
    let mut sink = create(output)?;
    let written = reconstruct_into(&descriptors, &store, &mut sink)?;
    info!(bytes = written, chunks = descriptors.len(), "reconstructed");
    Ok(())
}

fn run_stats(config: &ReduceConfig, input: &Path) -> Result<()> {
    let snapshot = collect_stats(config, input)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Segment `input`, then compress and verify every NEW chunk
fn collect_stats(config: &ReduceConfig, input: &Path) -> Result<MetricsSnapshot> {
    let handle = MetricsHandle::new();
    let metrics = handle.metrics();
    let store = ConcurrentChunkStore::new();
    let (descriptors, stats) = segment_stream(open(input)?, &store, &config.segmenter)?;
    metrics.record_segment(&stats);
    for desc in &descriptors {
        if let ChunkPayload::Literal(content) = &desc.payload {
            let mut encoder = LzwEncoder::new(Vec::new(), &config.codec)?;
            encoder.write(content)?;
            let (packed, codec_stats) = encoder.finish()?;
            metrics.record_compress(&codec_stats);

            let mut unpacked = Vec::with_capacity(content.len());
            let decode_stats =
                LzwDecoder::new(packed.as_slice(), &config.codec)?.decode_into(&mut unpacked)?;
            if unpacked != content.as_bytes() {
                bail!("chunk at offset {} did not survive the codec", desc.offset);
            }
            metrics.record_decompress(&decode_stats);
        }
    }
    Ok(handle.snapshot())
}
