//! Universal hashing of `K` projection outputs into one table bucket.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Largest prime below `2^32`.
pub const PRIME: u64 = 4_294_967_291;

const MASK_33: u64 = (1 << 33) - 1;

/// Coefficients are odd and below this bound.
const COEFF_BOUND: u32 = 1 << 29;

/// Odd random multipliers, one per hash function, shared by every table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalHashCoeffs {
    coeffs: Vec<u32>,
}

impl UniversalHashCoeffs {
    /// Wrap externally supplied coefficients.
    pub fn new(coeffs: Vec<u32>) -> Result<Self> {
        if coeffs.is_empty() {
            return Err(Error::InvalidParam("at least one coefficient is required"));
        }
        Ok(Self { coeffs })
    }

    /// Draw `hash_count` odd coefficients in `[1, 2^29)`.
    pub fn generate<R: Rng>(hash_count: usize, rng: &mut R) -> Result<Self> {
        if hash_count == 0 {
            return Err(Error::InvalidParam("hash_count must be >= 1"));
        }
        let coeffs = (0..hash_count)
            .map(|_| rng.gen_range(0..COEFF_BOUND / 2) * 2 + 1)
            .collect();
        Ok(Self { coeffs })
    }

    /// Deterministic coefficients for `seed`.
    pub fn from_seed(hash_count: usize, seed: u64) -> Result<Self> {
        Self::generate(hash_count, &mut StdRng::seed_from_u64(seed))
    }

    /// The multipliers.
    pub fn as_slice(&self) -> &[u32] {
        &self.coeffs
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// Always false for a constructed value.
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Bucket for `hashes` in a table of `capacity` bits.
    pub fn bucket(&self, hashes: &[u32], capacity: usize) -> usize {
        bucket_index(hashes, &self.coeffs, capacity)
    }
}

/// `((Σ h_i · c_i) mod 2^33) mod PRIME mod capacity`.
///
/// Extra hashes or coefficients beyond the shorter slice are ignored.
/// `capacity` must be non-zero.
pub fn bucket_index(hashes: &[u32], coeffs: &[u32], capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    // 2^33 divides 2^64, so wrapping arithmetic preserves the sum mod 2^33.
    let sum = hashes
        .iter()
        .zip(coeffs.iter())
        .fold(0u64, |acc, (&h, &c)| acc.wrapping_add(h as u64 * c as u64));
    (((sum & MASK_33) % PRIME) % capacity as u64) as usize
}
