//! Multi-table LSH similarity filter.
//!
//! A key is decoded into a vector, hashed by each table's p-stable projection family,
//! folded into one bucket per table with universal hashing, and recorded as a single
//! bit. A query asks every table; a table that misses its exact bucket gets a second
//! chance through multi-probe (each hash dimension nudged by -1 and +1).
//!
//! The filter answers "present" only when **every** table votes present. That trades
//! recall for a multiplicatively lower false-positive rate.
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use simfilter::{FieldStreamCodec, FilterConfig, SimilarityFilter};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let filter = SimilarityFilter::with_rng(FilterConfig::with_dimension(3), &mut rng).unwrap();
//!
//! let key = FieldStreamCodec::encode(&[1.0, 2.0, 3.0]);
//! filter.add(&key);
//! assert!(filter.is_present(&key));
//! ```

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, trace};

use crate::bitstore::BitTable;
use crate::bucket::UniversalHashCoeffs;
use crate::codec::VectorSource;
use crate::config::{DimensionPolicy, FilterConfig};
use crate::error::{Error, Result};
use crate::projection::ProjectionParams;

/// One table: its projection family and its bits.
#[derive(Debug, PartialEq)]
pub struct LshTable {
    params: Arc<ProjectionParams>,
    bits: BitTable,
}

impl LshTable {
    pub(crate) fn new(params: ProjectionParams, bits: BitTable) -> Self {
        Self {
            params: Arc::new(params),
            bits,
        }
    }

    /// Projection parameters of this table.
    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    /// Bit storage of this table.
    pub fn bits(&self) -> &BitTable {
        &self.bits
    }

    fn shared_copy(&self) -> Self {
        Self {
            params: Arc::clone(&self.params),
            bits: self.bits.shared_copy(),
        }
    }
}

/// Approximate similarity-membership filter over `L` bit tables.
///
/// `add`, `is_present` and `clear` take `&self`: bits are updated atomically one at
/// a time, and a query running next to writers may see any interleaving of them.
pub struct SimilarityFilter {
    config: FilterConfig,
    coeffs: UniversalHashCoeffs,
    tables: Vec<LshTable>,
    source: Arc<dyn VectorSource>,
}

impl SimilarityFilter {
    /// Build a filter with parameters drawn from the thread RNG.
    pub fn new(config: FilterConfig) -> Result<Self> {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Build a filter with parameters drawn from `rng`, independently per table.
    pub fn with_rng<R: Rng>(config: FilterConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let params = (0..config.num_tables)
            .map(|_| {
                ProjectionParams::generate(
                    config.hash_count,
                    config.dimension,
                    config.bucket_width,
                    &mut *rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Self::with_params(config, params)
    }

    /// Build a filter from externally supplied projection parameters, one per table.
    pub fn with_params(config: FilterConfig, params: Vec<ProjectionParams>) -> Result<Self> {
        config.validate()?;
        if params.len() != config.num_tables {
            return Err(Error::InvalidParam("one projection per table is required"));
        }
        let mut tables = Vec::with_capacity(params.len());
        for p in params {
            tables.push(LshTable::new(p, BitTable::new(config.capacity)?));
        }
        Self::from_tables(config, tables)
    }

    /// Assemble a filter from finished tables, checking them against `config`.
    pub(crate) fn from_tables(config: FilterConfig, tables: Vec<LshTable>) -> Result<Self> {
        config.validate()?;
        if tables.is_empty() {
            return Err(Error::InvalidParam("at least one table is required"));
        }
        for t in &tables {
            if t.params.hash_count() != config.hash_count {
                return Err(Error::InvalidParam("projection hash count differs from config"));
            }
            if t.params.dimension() != config.dimension {
                return Err(Error::InvalidParam("projection dimension differs from config"));
            }
        }
        let coeffs = UniversalHashCoeffs::from_seed(config.hash_count, config.coeff_seed)?;
        let source: Arc<dyn VectorSource> = Arc::new(config.codec);
        debug!(
            tables = tables.len(),
            hash_count = config.hash_count,
            dimension = config.dimension,
            capacity = tables[0].bits.num_bits(),
            "similarity filter ready"
        );
        Ok(Self {
            config,
            coeffs,
            tables,
            source,
        })
    }

    /// Replace the key decoder configured by `config.codec`.
    pub fn with_source(mut self, source: Arc<dyn VectorSource>) -> Self {
        self.source = source;
        self
    }

    /// The configuration this filter was built from.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Universal-hash coefficients shared by all tables.
    pub fn coeffs(&self) -> &UniversalHashCoeffs {
        &self.coeffs
    }

    /// The tables, in persisted order.
    pub fn tables(&self) -> &[LshTable] {
        &self.tables
    }

    /// Decode `key` with the configured source.
    pub fn vector(&self, key: &[u8]) -> Vec<f64> {
        self.source.vector(key)
    }

    /// Record `key`. Idempotent.
    pub fn add(&self, key: &[u8]) {
        self.add_vector(&self.vector(key));
    }

    /// Record `key`, rejecting mismatched dimensions under [`DimensionPolicy::Strict`].
    pub fn try_add(&self, key: &[u8]) -> Result<()> {
        let v = self.checked_vector(key)?;
        self.add_vector(&v);
        Ok(())
    }

    /// Record an already decoded vector.
    pub fn add_vector(&self, v: &[f64]) {
        for table in &self.tables {
            let hashes = self.hashes(table, v);
            table.bits.set(self.bucket(&hashes));
        }
    }

    /// Whether something similar to `key` was added.
    pub fn is_present(&self, key: &[u8]) -> bool {
        self.is_present_vector(&self.vector(key))
    }

    /// [`Self::is_present`], rejecting mismatched dimensions under [`DimensionPolicy::Strict`].
    pub fn try_is_present(&self, key: &[u8]) -> Result<bool> {
        let v = self.checked_vector(key)?;
        Ok(self.is_present_vector(&v))
    }

    /// Query with an already decoded vector.
    pub fn is_present_vector(&self, v: &[f64]) -> bool {
        self.tables
            .iter()
            .enumerate()
            .all(|(t, table)| self.table_votes(t, table, v))
    }

    fn table_votes(&self, t: usize, table: &LshTable, v: &[f64]) -> bool {
        let mut hashes = self.hashes(table, v);
        if table.bits.get(self.bucket(&hashes)) {
            return true;
        }
        for i in 0..hashes.len() {
            let exact = hashes[i];
            for probe in [exact.wrapping_sub(1), exact.wrapping_add(1)] {
                hashes[i] = probe;
                if table.bits.get(self.bucket(&hashes)) {
                    trace!(table = t, dim = i, "multi-probe hit");
                    return true;
                }
            }
            hashes[i] = exact;
        }
        false
    }

    fn hashes(&self, table: &LshTable, v: &[f64]) -> Vec<u32> {
        table
            .params
            .hashes(v, self.config.scale, self.config.bucket_width)
    }

    fn bucket(&self, hashes: &[u32]) -> i64 {
        self.coeffs.bucket(hashes, self.config.capacity) as i64
    }

    fn checked_vector(&self, key: &[u8]) -> Result<Vec<f64>> {
        let v = self.vector(key);
        if self.config.dimension_policy == DimensionPolicy::Strict
            && v.len() != self.config.dimension
        {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                got: v.len(),
            });
        }
        Ok(v)
    }

    /// Zero every table.
    pub fn clear(&self) {
        for table in &self.tables {
            table.bits.clear_all();
        }
        debug!(tables = self.tables.len(), "similarity filter cleared");
    }

    /// A new handle over the same tables. Parameters and bits are shared, not copied.
    pub fn shared_copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            coeffs: self.coeffs.clone(),
            tables: self.tables.iter().map(LshTable::shared_copy).collect(),
            source: Arc::clone(&self.source),
        }
    }

    /// Release this handle. Storage is freed with the last handle.
    pub fn close(self) {
        debug!(tables = self.tables.len(), "similarity filter handle closed");
    }

    /// Bytes held by the bit tables.
    pub fn off_heap_size(&self) -> usize {
        self.tables.iter().map(|t| t.bits.memory_usage()).sum()
    }

    /// Exact length of [`Self::to_bytes`].
    pub fn serialized_size(&self) -> usize {
        crate::serializer::serialized_size(self)
    }

    /// Persist in the big-endian table layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::serializer::to_bytes(self)
    }

    /// Restore a filter persisted by [`Self::to_bytes`] under the same `config`.
    pub fn from_bytes(bytes: &[u8], config: FilterConfig) -> Result<Self> {
        crate::serializer::from_bytes(bytes, config)
    }
}

impl PartialEq for SimilarityFilter {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.coeffs == other.coeffs && self.tables == other.tables
    }
}

impl fmt::Debug for SimilarityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityFilter")
            .field("config", &self.config)
            .field("tables", &self.tables)
            .finish()
    }
}
