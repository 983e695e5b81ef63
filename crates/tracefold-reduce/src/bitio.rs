//! Bit channel with self-terminating 7-bit-per-byte framing.
//!
//! Every payload byte carries 7 bits with bit 7 clear. The stream ends with a
//! single terminal byte that has bit 7 set, followed by `6 - cnt` one bits, one
//! zero bit, and finally the `cnt` leftover payload bits (0..=6). The terminal
//! byte alone tells the reader how much of it is payload, so no length field
//! is needed.

use crate::error::ReduceError;
use std::io::{ErrorKind, Read, Write};

/// Payload bits carried by each non-terminal byte
pub const BITS_PER_BYTE: u8 = 7;

const TERMINAL_FLAG: u8 = 0x80;

/// Build the terminal byte for `cnt` buffered bits held in the low bits of `acc`.
pub(crate) fn terminal_byte(acc: u8, cnt: u8) -> u8 {
    debug_assert!(cnt < BITS_PER_BYTE);
    let marker = (0xFFu16 << (cnt + 1)) as u8;
    marker | (acc & ((1u8 << cnt) - 1))
}

/// Number of valid payload bits in a terminal byte.
///
/// The first zero bit below bit 7 sits at position `p`; bits `p-1..=0` are
/// payload. A malformed `0xFF` has no zero bit and carries nothing.
pub(crate) fn terminal_payload_bits(byte: u8) -> u8 {
    let ones = byte.leading_ones() as u8;
    if ones >= 8 {
        0
    } else {
        7 - ones
    }
}

/// Packs individual bits into the framed byte stream.
pub struct BitWriter<W: Write> {
    inner: W,
    acc: u8,
    cnt: u8,
    bits_written: u64,
    closed: bool,
}

impl<W: Write> BitWriter<W> {
    /// Wrap a byte sink
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            acc: 0,
            cnt: 0,
            bits_written: 0,
            closed: false,
        }
    }

    /// Append one bit. A full group of 7 is flushed to the sink as one byte.
    pub fn write_bit(&mut self, bit: bool) -> Result<(), ReduceError> {
        if self.closed {
            return Err(ReduceError::InvalidState(
                "write after close on bit writer".to_string(),
            ));
        }
        self.acc = (self.acc << 1) | bit as u8;
        self.cnt += 1;
        self.bits_written += 1;
        if self.cnt == BITS_PER_BYTE {
            self.inner.write_all(&[self.acc])?;
            self.acc = 0;
            self.cnt = 0;
        }
        Ok(())
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, width: u8) -> Result<(), ReduceError> {
        debug_assert!(width <= 32);
        for shift in (0..width).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }
        Ok(())
    }

    /// Emit the terminal byte and flush the sink. Must be called exactly once.
    pub fn close(&mut self) -> Result<(), ReduceError> {
        if self.closed {
            return Err(ReduceError::InvalidState(
                "bit writer already closed".to_string(),
            ));
        }
        self.closed = true;
        let last = terminal_byte(self.acc, self.cnt);
        self.inner.write_all(&[last])?;
        self.inner.flush()?;
        self.acc = 0;
        self.cnt = 0;
        Ok(())
    }

    /// Total payload bits accepted so far
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Bits buffered and not yet emitted (0..=6)
    pub fn pending_bits(&self) -> u8 {
        self.cnt
    }

    /// True once `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Borrow the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Unpacks bits from a framed byte stream.
///
/// Bytes are pulled from the source one at a time, only when the current one
/// is exhausted, so the reader never consumes more input than the bits it
/// has handed out require.
pub struct BitReader<R: Read> {
    inner: R,
    current: u8,
    remaining: u8,
    terminal: bool,
    eos: bool,
    bytes_read: u64,
}

impl<R: Read> BitReader<R> {
    /// Wrap a byte source
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            remaining: 0,
            terminal: false,
            eos: false,
            bytes_read: 0,
        }
    }

    /// Next bit, or `None` at end of stream. Repeated calls past the end keep
    /// returning `None`.
    pub fn read_bit(&mut self) -> Result<Option<bool>, ReduceError> {
        loop {
            if self.remaining > 0 {
                self.remaining -= 1;
                return Ok(Some((self.current >> self.remaining) & 1 == 1));
            }
            if self.eos || self.terminal {
                self.eos = true;
                return Ok(None);
            }
            match self.next_byte()? {
                None => {
                    self.eos = true;
                    return Ok(None);
                }
                Some(byte) if byte & TERMINAL_FLAG == 0 => {
                    self.current = byte;
                    self.remaining = BITS_PER_BYTE;
                }
                Some(byte) => {
                    self.current = byte;
                    self.terminal = true;
                    self.remaining = terminal_payload_bits(byte);
                }
            }
        }
    }

    /// Read a `width`-bit value, most significant bit first.
    ///
    /// Returns `None` when the stream ends before any bit of the value is
    /// read. A value cut short mid-way is a framing error.
    pub fn read_bits(&mut self, width: u8) -> Result<Option<u32>, ReduceError> {
        debug_assert!(width <= 32);
        let mut value = 0u32;
        for i in 0..width {
            match self.read_bit()? {
                Some(bit) => value = (value << 1) | bit as u32,
                None if i == 0 => return Ok(None),
                None => {
                    return Err(ReduceError::CorruptStream(format!(
                        "stream ended after {i} of {width} bits"
                    )))
                }
            }
        }
        Ok(Some(value))
    }

    /// Fill `buf` with bits (one per element, 0 or 1).
    ///
    /// Returns how many bits were produced before end of stream, which is
    /// less than `buf.len()` only when the stream ended.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReduceError> {
        for (n, slot) in buf.iter_mut().enumerate() {
            match self.read_bit()? {
                Some(bit) => *slot = bit as u8,
                None => return Ok(n),
            }
        }
        Ok(buf.len())
    }

    /// True once end of stream has been reported
    pub fn is_eos(&self) -> bool {
        self.eos
    }

    /// Bytes pulled from the source so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Unwrap the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ReduceError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.bytes_read += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
