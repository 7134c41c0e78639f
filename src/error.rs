//! Error type shared by the filter, its codecs and the serializer.

/// Errors raised while building, querying or restoring a similarity filter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value or supplied projection/hyperplane matrix is unusable.
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),
    /// A decoded key has a different dimension than the filter is configured for.
    #[error("dimension mismatch (expected {expected}, got {got})")]
    DimensionMismatch {
        /// `FilterConfig::dimension`.
        expected: usize,
        /// Components decoded from the key.
        got: usize,
    },
    /// The persisted bytes ended before the layout was complete.
    #[error("truncated input (needed {needed} bytes, {remaining} remaining)")]
    Truncated {
        /// Bytes required by the next field.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// The persisted bytes are inconsistent with the layout or the configuration.
    #[error("corrupt filter: {0}")]
    Corrupt(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
