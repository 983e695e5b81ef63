//! Adaptive dictionary (LZW) codec over the 7-bit framed bit channel.
//!
//! Codes are written at a fixed width agreed out of band; the stream carries
//! no header. Encoder and decoder must be built from the same [`CodecConfig`]
//! or the output is meaningless, and neither side can detect a mismatch.

use crate::{
    bitio::{BitReader, BitWriter, BITS_PER_BYTE},
    dictionary::{BoundedCodeDictionary, Code, Namespace, PhraseTable, PRIMED_OFFSET},
    error::ReduceError,
    sequence::ByteSequence,
};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, instrument, trace};

/// Default fixed code width in bits
pub const DEFAULT_CODE_WIDTH: u8 = 12;
/// Narrowest accepted width (the 256 seed codes must fit)
pub const MIN_CODE_WIDTH: u8 = 8;
/// Widest accepted width
pub const MAX_CODE_WIDTH: u8 = 31;

const STREAM_BUF_SIZE: usize = 8 * 1024;

/// Codec parameters. Both ends of a stream must use identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Bits per emitted code
    pub code_width: u8,
    /// Dictionary entry cap; `None` means `2^code_width`
    pub capacity: Option<usize>,
    /// Multi-byte tokens seeded into the primed namespace
    pub primed_tokens: Vec<ByteSequence>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            code_width: DEFAULT_CODE_WIDTH,
            capacity: None,
            primed_tokens: Vec::new(),
        }
    }
}

impl CodecConfig {
    /// Config with the given width and defaults otherwise
    pub fn with_width(code_width: u8) -> Self {
        Self {
            code_width,
            ..Default::default()
        }
    }

    /// Largest code value representable at this width, plus one
    pub fn code_space(&self) -> u64 {
        1u64 << self.code_width
    }

    /// Dictionary cap actually applied
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or(self.code_space() as usize)
    }

    /// Check that every code the dictionary can assign fits the width.
    ///
    /// Primed codes start at [`PRIMED_OFFSET`], so primed tokens need a width
    /// of at least 18 bits and a capacity no larger than the offset (keeping
    /// primary codes out of the primed range). The default 12-bit width
    /// cannot carry primed tokens at all.
    pub fn validate(&self) -> Result<(), ReduceError> {
        if !(MIN_CODE_WIDTH..=MAX_CODE_WIDTH).contains(&self.code_width) {
            return Err(ReduceError::InvalidConfig(format!(
                "code width {} outside {}..={}",
                self.code_width, MIN_CODE_WIDTH, MAX_CODE_WIDTH
            )));
        }
        let capacity = self.effective_capacity() as u64;
        if capacity > self.code_space() {
            return Err(ReduceError::InvalidConfig(format!(
                "capacity {} exceeds the {}-bit code space",
                capacity, self.code_width
            )));
        }
        if self.primed_tokens.is_empty() {
            return Ok(());
        }
        if self.primed_tokens.iter().any(|t| t.is_empty()) {
            return Err(ReduceError::InvalidConfig(
                "primed tokens must not be empty".to_string(),
            ));
        }
        let last_primed = PRIMED_OFFSET as u64 + self.primed_tokens.len() as u64;
        if last_primed > self.code_space() {
            return Err(ReduceError::InvalidConfig(format!(
                "primed codes reach {} but a {}-bit width holds only {}",
                last_primed,
                self.code_width,
                self.code_space()
            )));
        }
        if capacity > PRIMED_OFFSET as u64 {
            return Err(ReduceError::InvalidConfig(format!(
                "capacity {} would let primary codes overlap primed codes at {}",
                capacity, PRIMED_OFFSET
            )));
        }
        Ok(())
    }

    /// Fresh dictionary in the state both ends start from
    pub fn build_dictionary(&self) -> BoundedCodeDictionary {
        let mut dict = BoundedCodeDictionary::new(self.effective_capacity());
        for token in &self.primed_tokens {
            dict.insert(token.clone(), Namespace::Primed);
        }
        dict
    }
}

/// Counters from one encode or decode session
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecStats {
    /// Uncompressed bytes consumed (encode) or produced (decode)
    pub raw_bytes: u64,
    /// Framed bytes produced (encode) or consumed (decode)
    pub packed_bytes: u64,
    /// Codes written or read
    pub codes: u64,
    /// Dictionary entries at the end of the session
    pub dictionary_size: usize,
    /// True if the dictionary hit its cap during the session
    pub saturated: bool,
}

impl CodecStats {
    /// raw / packed, or 1.0 when nothing was packed
    pub fn ratio(&self) -> f64 {
        if self.packed_bytes == 0 {
            1.0
        } else {
            self.raw_bytes as f64 / self.packed_bytes as f64
        }
    }
}

/// Streaming LZW encoder writing fixed-width codes to a byte sink
pub struct LzwEncoder<W: Write> {
    writer: BitWriter<W>,
    dict: BoundedCodeDictionary,
    width: u8,
    phrase: Vec<u8>,
    phrase_code: Option<Code>,
    stats: CodecStats,
}

impl<W: Write> LzwEncoder<W> {
    /// Validate `config` and start a session on `sink`
    pub fn new(sink: W, config: &CodecConfig) -> Result<Self, ReduceError> {
        config.validate()?;
        Ok(Self {
            writer: BitWriter::new(sink),
            dict: config.build_dictionary(),
            width: config.code_width,
            phrase: Vec::new(),
            phrase_code: None,
            stats: CodecStats::default(),
        })
    }

    /// Feed one input byte
    pub fn push(&mut self, byte: u8) -> Result<(), ReduceError> {
        self.stats.raw_bytes += 1;
        self.phrase.push(byte);
        if let Some(code) = self.dict.lookup(&self.phrase) {
            self.phrase_code = Some(code);
            return Ok(());
        }
        // phrase minus its last byte is the longest match; emit it and learn the extension
        if let Some(code) = self.phrase_code.take() {
            self.emit(code)?;
        }
        let learned = ByteSequence::from_slice(&self.phrase);
        if self.dict.insert(learned, Namespace::Primary).is_none() && !self.stats.saturated {
            self.stats.saturated = true;
            debug!(
                size = self.dict.size(),
                capacity = self.dict.capacity(),
                "encoder dictionary saturated"
            );
        }
        self.phrase.clear();
        self.phrase.push(byte);
        self.phrase_code = self.dict.lookup(&self.phrase);
        Ok(())
    }

    /// Feed a run of input bytes
    pub fn write(&mut self, data: &[u8]) -> Result<(), ReduceError> {
        for &b in data {
            self.push(b)?;
        }
        Ok(())
    }

    /// Flush the pending phrase, close the channel and return the sink
    pub fn finish(mut self) -> Result<(W, CodecStats), ReduceError> {
        if let Some(code) = self.phrase_code.take() {
            self.emit(code)?;
        }
        self.writer.close()?;
        self.stats.packed_bytes = self.writer.bits_written() / BITS_PER_BYTE as u64 + 1;
        self.stats.dictionary_size = self.dict.size();
        Ok((self.writer.into_inner(), self.stats))
    }

    fn emit(&mut self, code: Code) -> Result<(), ReduceError> {
        let value = code.value();
        debug_assert!((value as u64) < (1u64 << self.width));
        trace!(code = value, "emit");
        self.writer.write_bits(value, self.width)?;
        self.stats.codes += 1;
        Ok(())
    }
}

/// Streaming LZW decoder reading fixed-width codes from a byte source
pub struct LzwDecoder<R: Read> {
    reader: BitReader<R>,
    dict: BoundedCodeDictionary,
    width: u8,
    previous: Option<ByteSequence>,
    stats: CodecStats,
}

impl<R: Read> LzwDecoder<R> {
    /// Validate `config` and start a session on `source`
    pub fn new(source: R, config: &CodecConfig) -> Result<Self, ReduceError> {
        config.validate()?;
        Ok(Self {
            reader: BitReader::new(source),
            dict: config.build_dictionary(),
            width: config.code_width,
            previous: None,
            stats: CodecStats::default(),
        })
    }

    /// Decode the next phrase, or `None` at end of stream
    pub fn next_phrase(&mut self) -> Result<Option<ByteSequence>, ReduceError> {
        let value = match self.reader.read_bits(self.width)? {
            Some(v) => v,
            None => return Ok(None),
        };
        self.stats.codes += 1;
        let code = Code::from_value(value);
        let known = self.dict.decode(code).cloned();
        let (current, learned) = match (known, &self.previous) {
            (Some(seq), Some(prev)) => {
                let learned = prev.append_byte(seq[0]);
                (seq, Some(learned))
            }
            (Some(seq), None) => (seq, None),
            // the encoder is one entry ahead: code names prev + prev[0]
            (None, Some(prev)) if code == self.dict.next_primary() && !self.dict.is_full() => {
                let seq = prev.append_byte(prev[0]);
                (seq.clone(), Some(seq))
            }
            (None, _) => {
                return Err(ReduceError::CorruptStream(format!(
                    "code {} has no dictionary entry (dictionary size {})",
                    value,
                    self.dict.size()
                )))
            }
        };
        if let Some(seq) = learned {
            self.learn(seq);
        }
        self.stats.raw_bytes += current.len() as u64;
        self.previous = Some(current.clone());
        Ok(Some(current))
    }

    /// Decode the whole stream into `sink`
    pub fn decode_into<W: Write>(mut self, sink: &mut W) -> Result<CodecStats, ReduceError> {
        while let Some(phrase) = self.next_phrase()? {
            sink.write_all(&phrase)?;
        }
        sink.flush()?;
        self.stats.packed_bytes = self.reader.bytes_read();
        self.stats.dictionary_size = self.dict.size();
        Ok(self.stats)
    }

    fn learn(&mut self, seq: ByteSequence) {
        if self.dict.insert(seq, Namespace::Primary).is_none() && !self.stats.saturated {
            self.stats.saturated = true;
            debug!(size = self.dict.size(), "decoder dictionary saturated");
        }
    }
}

/// Compress a buffer
#[instrument(skip(data, config), fields(input_bytes = data.len(), width = config.code_width))]
pub fn compress(data: &[u8], config: &CodecConfig) -> Result<Vec<u8>, ReduceError> {
    let mut encoder = LzwEncoder::new(Vec::with_capacity(data.len() / 2 + 1), config)?;
    encoder.write(data)?;
    let (out, stats) = encoder.finish()?;
    debug!(
        compressed = out.len(),
        codes = stats.codes,
        saturated = stats.saturated,
        "buffer compressed"
    );
    Ok(out)
}

/// Decompress a buffer produced by [`compress`] with the same config
#[instrument(skip(data, config), fields(input_bytes = data.len(), width = config.code_width))]
pub fn decompress(data: &[u8], config: &CodecConfig) -> Result<Vec<u8>, ReduceError> {
    let decoder = LzwDecoder::new(data, config)?;
    let mut out = Vec::with_capacity(data.len() * 2);
    let stats = decoder.decode_into(&mut out)?;
    debug!(decompressed = out.len(), codes = stats.codes, "buffer decompressed");
    Ok(out)
}

/// Compress everything readable from `source` into `sink`
#[instrument(skip_all, fields(width = config.code_width))]
pub fn compress_stream<R: Read, W: Write>(
    mut source: R,
    sink: W,
    config: &CodecConfig,
) -> Result<CodecStats, ReduceError> {
    let mut encoder = LzwEncoder::new(sink, config)?;
    let mut buf = vec![0u8; STREAM_BUF_SIZE];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        encoder.write(&buf[..n])?;
    }
    let (_, stats) = encoder.finish()?;
    debug!(
        raw = stats.raw_bytes,
        packed = stats.packed_bytes,
        "stream compressed"
    );
    Ok(stats)
}

/// Decompress a framed stream from `source` into `sink`
#[instrument(skip_all, fields(width = config.code_width))]
pub fn decompress_stream<R: Read, W: Write>(
    source: R,
    mut sink: W,
    config: &CodecConfig,
) -> Result<CodecStats, ReduceError> {
    let stats = LzwDecoder::new(source, config)?.decode_into(&mut sink)?;
    debug!(
        raw = stats.raw_bytes,
        packed = stats.packed_bytes,
        "stream decompressed"
    );
    Ok(stats)
}
