//! p-stable projection hash family.
//!
//! Each table owns `K` hash functions
//!
//! ```text
//! h_i(v) = floor((b_i + Σ_k v_k · a_ik / R) / W)
//! ```
//!
//! with Gaussian `a_ik`, uniform `b_i ∈ [0, W)`, scale `R` and bucket width `W`
//! (Datar et al., 2004). Outputs are folded into `u32` so negative buckets still
//! make valid index components.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Error, Result};

/// Projection parameters for one table: a `K × D` matrix `a` and a length-`K` offset `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParams {
    a: Vec<Vec<f32>>,
    b: Vec<f32>,
}

impl ProjectionParams {
    /// Wrap externally supplied parameters.
    pub fn new(a: Vec<Vec<f32>>, b: Vec<f32>) -> Result<Self> {
        if a.is_empty() {
            return Err(Error::InvalidParam("projection needs at least one hash function"));
        }
        if a.len() != b.len() {
            return Err(Error::InvalidParam("projection rows and offsets must have equal length"));
        }
        let dim = a[0].len();
        if dim == 0 || a.iter().any(|row| row.len() != dim) {
            return Err(Error::InvalidParam("projection rows must share a non-zero dimension"));
        }
        Ok(Self { a, b })
    }

    /// Draw `hash_count` functions over `dimension` inputs with offsets in `[0, width)`.
    pub fn generate<R: Rng>(
        hash_count: usize,
        dimension: usize,
        width: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if hash_count == 0 || dimension == 0 {
            return Err(Error::InvalidParam("hash_count and dimension must be >= 1"));
        }
        let width = width as f32;
        if !(width.is_finite() && width > 0.0) {
            return Err(Error::InvalidParam("bucket width must be finite and > 0"));
        }
        let a = (0..hash_count)
            .map(|_| {
                (0..dimension)
                    .map(|_| rng.sample::<f32, _>(StandardNormal))
                    .collect()
            })
            .collect();
        let b = (0..hash_count)
            .map(|_| rng.gen_range(0.0..width))
            .collect();
        Ok(Self { a, b })
    }

    /// Number of hash functions `K`.
    pub fn hash_count(&self) -> usize {
        self.a.len()
    }

    /// Input dimension `D`.
    pub fn dimension(&self) -> usize {
        self.a[0].len()
    }

    /// The projection matrix, one row per hash function.
    pub fn a(&self) -> &[Vec<f32>] {
        &self.a
    }

    /// The offsets, one per hash function.
    pub fn b(&self) -> &[f32] {
        &self.b
    }

    /// All `K` hash outputs for `v`, folded into `u32`.
    ///
    /// Uses the overlapping prefix of `v` and each row.
    pub fn hashes(&self, v: &[f64], scale: f64, width: f64) -> Vec<u32> {
        self.a
            .iter()
            .zip(self.b.iter())
            .map(|(row, &b)| {
                let proj: f64 = v
                    .iter()
                    .zip(row.iter())
                    .map(|(&x, &a)| x * (a as f64 / scale))
                    .sum();
                fold_u32(((b as f64 + proj) / width).floor() as i64)
            })
            .collect()
    }
}

/// `((h mod 2^32) + 2^32) mod 2^32`.
pub fn fold_u32(h: i64) -> u32 {
    h.rem_euclid(1i64 << 32) as u32
}
