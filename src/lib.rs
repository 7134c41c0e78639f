//! `simfilter`: an LSH similarity-membership filter for dense vectors.
//!
//! Answers "has something similar to this vector been added?" with a bounded
//! false-positive rate, using p-stable locality-sensitive hashing over compact bit
//! tables:
//! - key decoding into vectors (length-prefixed fields or ASCII bit strings)
//! - random-hyperplane SimHash signatures
//! - p-stable projection hashing, folded into table buckets with universal hashing
//! - multi-table bit storage with multi-probe queries
//! - a bit-exact big-endian persisted layout
//!
//! Scope here is the filter itself. Extracting key bytes from records, owning the
//! storage lifecycle and any surrounding file format belong to the host.

#![warn(missing_docs)]

pub mod bitstore;
pub mod bucket;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod projection;
pub mod serializer;
pub mod simhash;

pub use bitstore::BitTable;
pub use bucket::{bucket_index, UniversalHashCoeffs};
pub use codec::{BitStringCodec, CodecKind, FieldStreamCodec, VectorSource};
pub use config::{DimensionPolicy, FilterConfig};
pub use error::{Error, Result};
pub use filter::{LshTable, SimilarityFilter};
pub use projection::ProjectionParams;
pub use simhash::{HyperplaneHash, Signature};
