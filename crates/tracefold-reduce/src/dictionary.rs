//! Phrase dictionaries for the adaptive codec.
//!
//! Two code namespaces share one dictionary. Primary codes count up from 0
//! and start out holding all 256 single-byte phrases. Primed codes count up
//! from [`PRIMED_OFFSET`] and hold multi-byte tokens seeded out of band.
//! Codes are never reassigned or removed.

use crate::sequence::ByteSequence;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// First numeric value of the primed namespace.
///
/// This sits far above a 12-bit code space; see `CodecConfig::validate` for
/// the widths under which primed codes can actually be transmitted.
pub const PRIMED_OFFSET: u32 = 200_000;

/// Number of single-byte phrases seeded into every fresh dictionary
pub const SEED_ENTRIES: usize = 256;

/// Which namespace a phrase is inserted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Sequential codes from 0
    Primary,
    /// Sequential codes from [`PRIMED_OFFSET`]
    Primed,
}

/// A dictionary code, tagged with its namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// Index into the primary table
    Primary(u32),
    /// Index into the primed table (not including the offset)
    Primed(u32),
}

impl Code {
    /// Numeric value as transmitted on the wire
    pub fn value(self) -> u32 {
        match self {
            Code::Primary(i) => i,
            Code::Primed(i) => PRIMED_OFFSET + i,
        }
    }

    /// Inverse of [`Code::value`]
    pub fn from_value(value: u32) -> Self {
        if value >= PRIMED_OFFSET {
            Code::Primed(value - PRIMED_OFFSET)
        } else {
            Code::Primary(value)
        }
    }

    /// Namespace this code belongs to
    pub fn namespace(self) -> Namespace {
        match self {
            Code::Primary(_) => Namespace::Primary,
            Code::Primed(_) => Namespace::Primed,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Lookup, insertion and reverse lookup shared by the plain and bounded
/// dictionaries. The codec is written against this trait.
pub trait PhraseTable {
    /// Code of `seq`, if present in either namespace
    fn lookup(&self, seq: &[u8]) -> Option<Code>;

    /// Insert `seq` into `namespace`, returning its code.
    ///
    /// Returns the existing code if `seq` is already present. Returns `None`
    /// only when the table refuses to grow.
    fn insert(&mut self, seq: ByteSequence, namespace: Namespace) -> Option<Code>;

    /// Phrase for `code`, if assigned
    fn decode(&self, code: Code) -> Option<&ByteSequence>;

    /// Entries across both namespaces
    fn size(&self) -> usize;

    /// Code the next primary insertion would receive
    fn next_primary(&self) -> Code;

    /// True when further insertions are refused
    fn is_full(&self) -> bool {
        false
    }
}

/// Unbounded two-namespace dictionary
#[derive(Debug, Clone)]
pub struct CodeDictionary {
    codes: HashMap<ByteSequence, Code>,
    primary: Vec<ByteSequence>,
    primed: Vec<ByteSequence>,
}

impl Default for CodeDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeDictionary {
    /// Fresh dictionary with codes 0..=255 bound to the single bytes
    pub fn new() -> Self {
        let mut dict = Self {
            codes: HashMap::with_capacity(SEED_ENTRIES * 2),
            primary: Vec::with_capacity(SEED_ENTRIES * 2),
            primed: Vec::new(),
        };
        for byte in 0..=u8::MAX {
            dict.insert(ByteSequence::single(byte), Namespace::Primary);
        }
        dict
    }

    /// Entries in the primary namespace
    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    /// Entries in the primed namespace
    pub fn primed_len(&self) -> usize {
        self.primed.len()
    }
}

impl PhraseTable for CodeDictionary {
    fn lookup(&self, seq: &[u8]) -> Option<Code> {
        self.codes.get(seq).copied()
    }

    fn insert(&mut self, seq: ByteSequence, namespace: Namespace) -> Option<Code> {
        if let Some(code) = self.codes.get(&seq) {
            return Some(*code);
        }
        let code = match namespace {
            Namespace::Primary => {
                let code = Code::Primary(self.primary.len() as u32);
                self.primary.push(seq.clone());
                code
            }
            Namespace::Primed => {
                let code = Code::Primed(self.primed.len() as u32);
                self.primed.push(seq.clone());
                code
            }
        };
        self.codes.insert(seq, code);
        Some(code)
    }

    fn decode(&self, code: Code) -> Option<&ByteSequence> {
        match code {
            Code::Primary(i) => self.primary.get(i as usize),
            Code::Primed(i) => self.primed.get(i as usize),
        }
    }

    fn size(&self) -> usize {
        self.primary.len() + self.primed.len()
    }

    fn next_primary(&self) -> Code {
        Code::Primary(self.primary.len() as u32)
    }
}

/// Dictionary that stops growing once `size() >= capacity`.
///
/// Insertion past capacity is a silent no-op: the table freezes and lookups
/// keep working against the entries it already has.
#[derive(Debug, Clone)]
pub struct BoundedCodeDictionary {
    inner: CodeDictionary,
    capacity: usize,
}

impl BoundedCodeDictionary {
    /// Fresh seeded dictionary capped at `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: CodeDictionary::new(),
            capacity,
        }
    }

    /// Configured entry cap
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the wrapped dictionary
    pub fn inner(&self) -> &CodeDictionary {
        &self.inner
    }
}

impl PhraseTable for BoundedCodeDictionary {
    fn lookup(&self, seq: &[u8]) -> Option<Code> {
        self.inner.lookup(seq)
    }

    fn insert(&mut self, seq: ByteSequence, namespace: Namespace) -> Option<Code> {
        if let Some(code) = self.inner.lookup(&seq) {
            return Some(code);
        }
        if self.is_full() {
            return None;
        }
        self.inner.insert(seq, namespace)
    }

    fn decode(&self, code: Code) -> Option<&ByteSequence> {
        self.inner.decode(code)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn next_primary(&self) -> Code {
        self.inner.next_primary()
    }

    fn is_full(&self) -> bool {
        self.inner.size() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_dictionary_is_seeded() {
        let dict = CodeDictionary::new();
        assert_eq!(dict.size(), 256);
        assert_eq!(dict.primary_len(), 256);
        assert_eq!(dict.primed_len(), 0);
        for byte in 0..=255u8 {
            assert_eq!(dict.lookup(&[byte]), Some(Code::Primary(byte as u32)));
            assert_eq!(
                dict.decode(Code::Primary(byte as u32)),
                Some(&ByteSequence::single(byte))
            );
        }
        assert_eq!(dict.lookup(b"AB"), None);
        assert_eq!(dict.next_primary(), Code::Primary(256));
    }

    #[test]
    fn primary_and_primed_codes_are_sequential() {
        let mut dict = CodeDictionary::new();
        assert_eq!(dict.insert("AB".into(), Namespace::Primary), Some(Code::Primary(256)));
        assert_eq!(dict.insert("ABC".into(), Namespace::Primary), Some(Code::Primary(257)));
        assert_eq!(dict.insert("<tok>".into(), Namespace::Primed), Some(Code::Primed(0)));
        assert_eq!(dict.insert("<tok2>".into(), Namespace::Primed), Some(Code::Primed(1)));
        assert_eq!(dict.size(), 260);
        assert_eq!(Code::Primed(1).value(), PRIMED_OFFSET + 1);
        assert_eq!(dict.decode(Code::Primed(0)), Some(&ByteSequence::from("<tok>")));
        assert_eq!(dict.decode(Code::Primed(2)), None);
    }

    #[test]
    fn insert_existing_returns_existing_code() {
        let mut dict = CodeDictionary::new();
        let first = dict.insert("XY".into(), Namespace::Primed);
        let again = dict.insert("XY".into(), Namespace::Primary);
        assert_eq!(first, again);
        assert_eq!(dict.size(), 257);
        assert_eq!(dict.insert(ByteSequence::single(b'A'), Namespace::Primed), Some(Code::Primary(65)));
    }

    #[test]
    fn code_value_roundtrip() {
        for code in [Code::Primary(0), Code::Primary(4095), Code::Primed(0), Code::Primed(17)] {
            assert_eq!(Code::from_value(code.value()), code);
        }
        assert_eq!(Code::Primed(3).namespace(), Namespace::Primed);
        assert_eq!(Code::Primary(3).to_string(), "3");
    }

    #[test]
    fn bounded_dictionary_freezes_at_capacity() {
        let mut dict = BoundedCodeDictionary::new(258);
        assert!(!dict.is_full());
        assert_eq!(dict.insert("AA".into(), Namespace::Primary), Some(Code::Primary(256)));
        assert_eq!(dict.insert("BB".into(), Namespace::Primary), Some(Code::Primary(257)));
        assert!(dict.is_full());
        assert_eq!(dict.insert("CC".into(), Namespace::Primary), None);
        assert_eq!(dict.insert("DD".into(), Namespace::Primed), None);
        assert_eq!(dict.size(), 258);
        // existing entries still resolve
        assert_eq!(dict.insert("AA".into(), Namespace::Primary), Some(Code::Primary(256)));
        assert_eq!(dict.lookup(b"BB"), Some(Code::Primary(257)));
        assert_eq!(dict.decode(Code::Primary(257)), Some(&ByteSequence::from("BB")));
        assert_eq!(dict.lookup(b"CC"), None);
    }

    #[test]
    fn bounded_below_seed_size_is_frozen_from_start() {
        let mut dict = BoundedCodeDictionary::new(16);
        assert!(dict.is_full());
        assert_eq!(dict.size(), 256);
        assert_eq!(dict.insert("AB".into(), Namespace::Primary), None);
    }
}
