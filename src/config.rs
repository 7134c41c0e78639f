//! Filter configuration.
//!
//! Everything a filter needs is passed in explicitly; nothing is read from
//! process-wide state. The struct deserializes with defaults so it can be embedded
//! in a host's YAML/JSON configuration.

use serde::Deserialize;

use crate::codec::CodecKind;
use crate::error::{Error, Result};

/// How decoded vectors whose length differs from `dimension` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Use the overlapping prefix of the vector and the projection rows.
    #[default]
    Truncate,
    /// Reject the vector in the fallible entry points.
    Strict,
}

/// Parameters of a [`SimilarityFilter`](crate::SimilarityFilter).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Vector dimension `D`.
    pub dimension: usize,
    /// Number of bit tables `L`.
    pub num_tables: usize,
    /// Projection hash functions per table `K`.
    pub hash_count: usize,
    /// Quantization bucket width `W`.
    pub bucket_width: f64,
    /// Projection scale `R`.
    pub scale: f64,
    /// Bits per table `M`.
    pub capacity: usize,
    /// Seed for the universal-hash coefficients.
    ///
    /// The persisted layout does not carry the coefficients, so a filter must be
    /// reloaded with the same seed it was built with.
    pub coeff_seed: u64,
    /// Key decoder used unless a custom source is injected.
    pub codec: CodecKind,
    /// Dimension mismatch handling.
    pub dimension_policy: DimensionPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            dimension: 6,
            num_tables: 4,
            hash_count: 3,
            bucket_width: 4.0,
            scale: 2.0,
            capacity: 5000,
            coeff_seed: 0x5EED_CAFE,
            codec: CodecKind::FieldStream,
            dimension_policy: DimensionPolicy::Truncate,
        }
    }
}

impl FilterConfig {
    /// Default configuration for vectors of `dimension` components.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Set the number of tables.
    pub fn num_tables(mut self, num_tables: usize) -> Self {
        self.num_tables = num_tables;
        self
    }

    /// Set the hash functions per table.
    pub fn hash_count(mut self, hash_count: usize) -> Self {
        self.hash_count = hash_count;
        self
    }

    /// Set bits per table.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the bucket width `W`.
    pub fn bucket_width(mut self, bucket_width: f64) -> Self {
        self.bucket_width = bucket_width;
        self
    }

    /// Set the projection scale `R`.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the key codec.
    pub fn codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Set the dimension policy.
    pub fn dimension_policy(mut self, policy: DimensionPolicy) -> Self {
        self.dimension_policy = policy;
        self
    }

    /// Set the coefficient seed.
    pub fn coeff_seed(mut self, seed: u64) -> Self {
        self.coeff_seed = seed;
        self
    }

    /// Reject configurations no filter can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidParam("dimension must be >= 1"));
        }
        if self.num_tables == 0 {
            return Err(Error::InvalidParam("num_tables must be >= 1"));
        }
        if self.hash_count == 0 {
            return Err(Error::InvalidParam("hash_count must be >= 1"));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidParam("capacity must be >= 1"));
        }
        if !(self.bucket_width.is_finite() && self.bucket_width > 0.0) {
            return Err(Error::InvalidParam("bucket_width must be finite and > 0"));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidParam("scale must be finite and > 0"));
        }
        // sizes are persisted as signed 32-bit counts
        let max = i32::MAX as usize;
        if self.dimension > max || self.num_tables > max || self.hash_count > max {
            return Err(Error::InvalidParam("sizes must fit in an i32"));
        }
        if self.capacity > max {
            return Err(Error::InvalidParam("capacity must fit in an i32"));
        }
        Ok(())
    }
}
