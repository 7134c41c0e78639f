//! Fixed-capacity bit tables backing the filter.
//!
//! Bits live in shared 16-bit words so that [`BitTable::shared_copy`] handles
//! observe each other's writes. Single-bit updates are atomic; there is no
//! cross-bit or cross-probe atomicity.

use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Bits per storage word.
pub const WORD_BITS: usize = 16;

/// A fixed-size bit array of `num_bits` bits.
pub struct BitTable {
    words: Arc<[AtomicU16]>,
    num_bits: usize,
}

impl BitTable {
    /// An all-zero table of `num_bits` bits.
    pub fn new(num_bits: usize) -> Result<Self> {
        check_capacity(num_bits)?;
        let words = (0..num_bits.div_ceil(WORD_BITS))
            .map(|_| AtomicU16::new(0))
            .collect();
        Ok(Self { words, num_bits })
    }

    /// Rebuild a table from packed words, bit `i` at word `i / 16`, bit `i % 16`.
    pub fn from_words(num_bits: usize, words: Vec<u16>) -> Result<Self> {
        check_capacity(num_bits)?;
        if words.len() != num_bits.div_ceil(WORD_BITS) {
            return Err(Error::InvalidParam("word count does not match bit count"));
        }
        let words = words.into_iter().map(AtomicU16::new).collect();
        Ok(Self { words, num_bits })
    }

    /// Number of addressable bits.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Number of 16-bit storage words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Bytes held by the storage words.
    pub fn memory_usage(&self) -> usize {
        self.words.len() * std::mem::size_of::<u16>()
    }

    fn slot(&self, index: i64) -> (usize, u16) {
        let bit = index.rem_euclid(self.num_bits as i64) as usize;
        (bit / WORD_BITS, 1u16 << (bit % WORD_BITS))
    }

    /// Set bit `index`, folded into `[0, num_bits)`.
    pub fn set(&self, index: i64) {
        let (word, mask) = self.slot(index);
        self.words[word].fetch_or(mask, Ordering::Relaxed);
    }

    /// Read bit `index`, folded into `[0, num_bits)`.
    pub fn get(&self, index: i64) -> bool {
        let (word, mask) = self.slot(index);
        self.words[word].load(Ordering::Relaxed) & mask != 0
    }

    /// Clear bit `index`, folded into `[0, num_bits)`.
    pub fn clear_bit(&self, index: i64) {
        let (word, mask) = self.slot(index);
        self.words[word].fetch_and(!mask, Ordering::Relaxed);
    }

    /// Zero every bit.
    pub fn clear_all(&self) {
        for w in self.words.iter() {
            w.store(0, Ordering::Relaxed);
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Snapshot of the packed words.
    pub fn words(&self) -> Vec<u16> {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed))
            .collect()
    }

    /// A new handle over the same storage.
    pub fn shared_copy(&self) -> Self {
        Self {
            words: Arc::clone(&self.words),
            num_bits: self.num_bits,
        }
    }

    /// Whether both handles alias the same storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.words, &other.words)
    }
}

fn check_capacity(num_bits: usize) -> Result<()> {
    if num_bits == 0 {
        return Err(Error::InvalidParam("table capacity must be >= 1"));
    }
    // persisted as a signed 32-bit count
    if num_bits > i32::MAX as usize {
        return Err(Error::InvalidParam("table capacity must fit in an i32"));
    }
    Ok(())
}

impl PartialEq for BitTable {
    fn eq(&self, other: &Self) -> bool {
        self.num_bits == other.num_bits && self.words() == other.words()
    }
}

impl fmt::Debug for BitTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitTable")
            .field("num_bits", &self.num_bits)
            .field("ones", &self.count_ones())
            .finish()
    }
}
