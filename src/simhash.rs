//! Random-hyperplane SimHash signatures for keys.
//!
//! SimHash (Charikar, 2002) signs the dot product of a vector against a fixed set of
//! random hyperplanes. The Hamming distance between two signatures estimates the
//! angle between the vectors.

use std::sync::Arc;

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::codec::{FieldStreamCodec, VectorSource};
use crate::error::{Error, Result};

/// Length of the random key drawn by [`HyperplaneHash::random_signature`].
const RANDOM_KEY_LEN: usize = 6 * 8;

/// A fixed-width bit signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    words: Vec<u64>,
    len: usize,
}

impl Signature {
    fn zeros(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    fn set(&mut self, bit: usize) {
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    /// Build a signature of `len` bits from the bits of `value`.
    pub fn from_u64(value: u64, len: usize) -> Self {
        let mut sig = Self::zeros(len);
        for bit in 0..len.min(64) {
            if (value >> bit) & 1 == 1 {
                sig.set(bit);
            }
        }
        sig
    }

    /// Whether bit `bit` is set. Out-of-range bits read as clear.
    pub fn get(&self, bit: usize) -> bool {
        bit < self.len && (self.words[bit / 64] >> (bit % 64)) & 1 == 1
    }

    /// Width in bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-width signature.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Low 64 bits, bit `j` of the signature at bit `j` of the result.
    pub fn to_u64(&self) -> u64 {
        self.words.first().copied().unwrap_or(0)
    }

    /// Hamming distance between two signatures (XOR + popcount).
    ///
    /// Bits beyond the shorter signature count as differing when set.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        let n = self.words.len().max(other.words.len());
        (0..n)
            .map(|i| {
                let a = self.words.get(i).copied().unwrap_or(0);
                let b = other.words.get(i).copied().unwrap_or(0);
                (a ^ b).count_ones()
            })
            .sum()
    }
}

/// Signature generator over a fixed hyperplane matrix.
#[derive(Clone)]
pub struct HyperplaneHash {
    hyperplanes: Vec<Vec<f64>>,
    source: Arc<dyn VectorSource>,
}

impl std::fmt::Debug for HyperplaneHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperplaneHash")
            .field("num_bits", &self.num_bits())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl HyperplaneHash {
    /// Create a generator from an explicit `num_bits × D` matrix.
    ///
    /// Keys are decoded with [`FieldStreamCodec`].
    pub fn new(hyperplanes: Vec<Vec<f64>>) -> Result<Self> {
        if hyperplanes.is_empty() {
            return Err(Error::InvalidParam("at least one hyperplane is required"));
        }
        let dim = hyperplanes[0].len();
        if dim == 0 {
            return Err(Error::InvalidParam("hyperplane dimension must be >= 1"));
        }
        if hyperplanes.iter().any(|h| h.len() != dim) {
            return Err(Error::InvalidParam("hyperplanes must share one dimension"));
        }
        Ok(Self {
            hyperplanes,
            source: Arc::new(FieldStreamCodec),
        })
    }

    /// Draw `num_bits` Gaussian hyperplanes of dimension `dimension`.
    pub fn generate<R: Rng>(num_bits: usize, dimension: usize, rng: &mut R) -> Result<Self> {
        if num_bits == 0 || dimension == 0 {
            return Err(Error::InvalidParam("num_bits and dimension must be >= 1"));
        }
        let hyperplanes: Vec<Vec<f64>> = (0..num_bits)
            .map(|_| {
                (0..dimension)
                    .map(|_| rng.sample::<f64, _>(StandardNormal))
                    .collect()
            })
            .collect();
        Self::new(hyperplanes)
    }

    /// Replace the key decoder.
    pub fn with_source(mut self, source: Arc<dyn VectorSource>) -> Self {
        self.source = source;
        self
    }

    /// Signature width.
    pub fn num_bits(&self) -> usize {
        self.hyperplanes.len()
    }

    /// Hyperplane dimension `D`.
    pub fn dimension(&self) -> usize {
        self.hyperplanes[0].len()
    }

    /// Signature of `key`: bit `j` is set iff `dot(v, hyperplanes[j]) >= 0`.
    ///
    /// The dot product runs over the overlapping prefix of `v` and the hyperplane.
    pub fn signature(&self, key: &[u8]) -> Signature {
        self.signature_of(&self.source.vector(key))
    }

    /// Signature of an already decoded vector.
    pub fn signature_of(&self, v: &[f64]) -> Signature {
        let mut sig = Signature::zeros(self.num_bits());
        for (j, plane) in self.hyperplanes.iter().enumerate() {
            if dot(v, plane) >= 0.0 {
                sig.set(j);
            }
        }
        sig
    }

    /// Signature of a freshly drawn random key.
    ///
    /// Not reproducible; use it for sampling, never for indexing.
    pub fn random_signature(&self) -> Signature {
        let mut key = [0u8; RANDOM_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        self.signature(&key)
    }
}

/// Dot product over the overlapping prefix.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
