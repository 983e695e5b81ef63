//! Rolling polynomial fingerprint over a fixed trailing window.
//!
//! `h = b[0]·B^(n-1) + b[1]·B^(n-2) + … + b[n-1]` over the last `n` bytes,
//! computed in wrapping 64-bit arithmetic. The base is the odd FNV-1a prime
//! so that the low bits of `h` depend on every byte in the window.

use std::collections::VecDeque;

/// Default window length in bytes
pub const DEFAULT_WINDOW: usize = 48;

/// Polynomial base (64-bit FNV prime)
pub const BASE: u64 = 0x0000_0100_0000_01b3;

/// Incrementally maintained hash of the most recent `window` bytes
#[derive(Debug, Clone)]
pub struct RollingFingerprint {
    window: VecDeque<u8>,
    capacity: usize,
    hash: u64,
    // BASE^capacity, the weight an evicted byte carries after the new push
    out_factor: u64,
}

impl Default for RollingFingerprint {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RollingFingerprint {
    /// Create a fingerprint over a window of `capacity` bytes (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let out_factor = (0..capacity).fold(1u64, |acc, _| acc.wrapping_mul(BASE));
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            hash: 0,
            out_factor,
        }
    }

    /// Push one byte, evicting the oldest once the window is full. O(1).
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.hash = self.hash.wrapping_mul(BASE).wrapping_add(byte as u64);
        self.window.push_back(byte);
        if self.window.len() > self.capacity {
            if let Some(old) = self.window.pop_front() {
                self.hash = self
                    .hash
                    .wrapping_sub((old as u64).wrapping_mul(self.out_factor));
            }
        }
    }

    /// Current fingerprint value
    #[inline]
    pub fn value(&self) -> u64 {
        self.hash
    }

    /// Clear the window and hash
    pub fn reset(&mut self) {
        self.window.clear();
        self.hash = 0;
    }

    /// Bytes currently in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// True if no bytes have been pushed since the last reset
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// True once the window holds `window_size()` bytes
    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    /// Configured window length
    pub fn window_size(&self) -> usize {
        self.capacity
    }
}

/// Fingerprint of `data` computed from scratch (no rolling)
pub fn fingerprint_of(data: &[u8]) -> u64 {
    data.iter()
        .fold(0u64, |h, &b| h.wrapping_mul(BASE).wrapping_add(b as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_value_is_zero() {
        let fp = RollingFingerprint::default();
        assert_eq!(fp.value(), 0);
        assert!(fp.is_empty());
        assert_eq!(fp.window_size(), 48);
    }

    #[test]
    fn partial_window_matches_direct_hash() {
        let mut fp = RollingFingerprint::default();
        for &b in b"abcdef" {
            fp.push_byte(b);
        }
        assert_eq!(fp.value(), fingerprint_of(b"abcdef"));
        assert_eq!(fp.len(), 6);
        assert!(!fp.is_full());
    }

    #[test]
    fn full_window_tracks_last_bytes_only() {
        let data: Vec<u8> = (0..500u32).map(|i| (i * 31 % 256) as u8).collect();
        let mut fp = RollingFingerprint::new(48);
        for &b in &data {
            fp.push_byte(b);
        }
        assert!(fp.is_full());
        assert_eq!(fp.value(), fingerprint_of(&data[data.len() - 48..]));
    }

    #[test]
    fn reset_clears_state() {
        let mut fp = RollingFingerprint::new(4);
        for &b in b"xyzzy" {
            fp.push_byte(b);
        }
        fp.reset();
        assert_eq!(fp.value(), 0);
        assert!(fp.is_empty());
        fp.push_byte(b'q');
        assert_eq!(fp.value(), b'q' as u64);
    }

    #[test]
    fn same_window_same_value_regardless_of_prefix() {
        let tail = b"the quick brown fox jumps over the lazy dog, twice over!";
        let mut a = RollingFingerprint::new(16);
        let mut b = RollingFingerprint::new(16);
        for &x in b"some prefix".iter().chain(tail.iter()) {
            a.push_byte(x);
        }
        for &x in b"another, much longer prefix here".iter().chain(tail.iter()) {
            b.push_byte(x);
        }
        assert_eq!(a.value(), b.value());
    }

    proptest! {
        #[test]
        fn prop_rolling_equals_window_hash(
            data in prop::collection::vec(any::<u8>(), 0..2_000),
            window in 1usize..100,
        ) {
            let mut fp = RollingFingerprint::new(window);
            for &b in &data {
                fp.push_byte(b);
            }
            let start = data.len().saturating_sub(window);
            prop_assert_eq!(fp.value(), fingerprint_of(&data[start..]));
        }
    }
}
