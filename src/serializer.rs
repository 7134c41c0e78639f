//! Persisted filter layout.
//!
//! All integers and floats are big-endian.
//!
//! ```text
//! i32 hash_count                      K
//! i32 table_count                     L
//! L times:
//!     i32 b_len                       = K
//!     f32 b[K]
//!     i32 a_rows                      = K
//!     a_rows times:
//!         i32 row_len                 = D
//!         f32 row[D]
//!     i32 bits_size                   M
//!     i16 words[ceil(M / 16)]
//! ```
//!
//! The universal-hash coefficients, `W`, `R` and the codec are not stored; they come
//! from the [`FilterConfig`] passed to [`deserialize`].

use bytes::{Buf, BufMut};
use tracing::debug;

use crate::bitstore::{BitTable, WORD_BITS};
use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::filter::{LshTable, SimilarityFilter};
use crate::projection::ProjectionParams;

const INT: usize = 4;
const FLOAT: usize = 4;
const SHORT: usize = 2;

/// Exact number of bytes [`serialize`] writes for `filter`.
pub fn serialized_size(filter: &SimilarityFilter) -> usize {
    let tables: usize = filter
        .tables()
        .iter()
        .map(|t| {
            let p = t.params();
            let b = INT + p.b().len() * FLOAT;
            let a = INT + p.a().iter().map(|row| INT + row.len() * FLOAT).sum::<usize>();
            let bits = INT + t.bits().word_count() * SHORT;
            b + a + bits
        })
        .sum();
    INT + INT + tables
}

/// Write `filter` into `out`.
pub fn serialize<B: BufMut>(filter: &SimilarityFilter, out: &mut B) {
    out.put_i32(filter.config().hash_count as i32);
    out.put_i32(filter.tables().len() as i32);
    for table in filter.tables() {
        let p = table.params();
        out.put_i32(p.b().len() as i32);
        for &b in p.b() {
            out.put_f32(b);
        }
        out.put_i32(p.a().len() as i32);
        for row in p.a() {
            out.put_i32(row.len() as i32);
            for &a in row {
                out.put_f32(a);
            }
        }
        let bits = table.bits();
        out.put_i32(bits.num_bits() as i32);
        for w in bits.words() {
            out.put_i16(w as i16);
        }
    }
}

/// Serialize into a freshly allocated buffer of exactly [`serialized_size`] bytes.
pub fn to_bytes(filter: &SimilarityFilter) -> Vec<u8> {
    let mut out = Vec::with_capacity(serialized_size(filter));
    serialize(filter, &mut out);
    out
}

/// Read one filter from `buf`, checking every length against `config`.
///
/// Either the whole filter is returned or an error; `buf` may be partially consumed
/// on error.
pub fn deserialize<B: Buf>(buf: &mut B, config: FilterConfig) -> Result<SimilarityFilter> {
    config.validate()?;
    let hash_count = read_len(buf, "hash count")?;
    if hash_count != config.hash_count {
        return Err(Error::Corrupt(format!(
            "hash count {hash_count} differs from configured {}",
            config.hash_count
        )));
    }
    let table_count = read_len(buf, "table count")?;
    if table_count != config.num_tables {
        return Err(Error::Corrupt(format!(
            "table count {table_count} differs from configured {}",
            config.num_tables
        )));
    }

    let mut tables = Vec::with_capacity(table_count);
    for _ in 0..table_count {
        tables.push(read_table(buf, &config)?);
    }
    debug!(
        tables = tables.len(),
        hash_count,
        dimension = config.dimension,
        "similarity filter deserialized"
    );
    SimilarityFilter::from_tables(config, tables)
}

/// Read a filter that occupies all of `bytes`.
pub fn from_bytes(mut bytes: &[u8], config: FilterConfig) -> Result<SimilarityFilter> {
    let filter = deserialize(&mut bytes, config)?;
    if bytes.has_remaining() {
        return Err(Error::Corrupt(format!(
            "{} trailing bytes after filter",
            bytes.remaining()
        )));
    }
    Ok(filter)
}

fn read_table<B: Buf>(buf: &mut B, config: &FilterConfig) -> Result<LshTable> {
    let b_len = read_len(buf, "offset length")?;
    expect_eq("offset length", b_len, config.hash_count)?;
    let b = read_floats(buf, b_len)?;

    let rows = read_len(buf, "projection row count")?;
    expect_eq("projection row count", rows, config.hash_count)?;
    let mut a = Vec::with_capacity(rows);
    for _ in 0..rows {
        let row_len = read_len(buf, "projection row length")?;
        expect_eq("projection row length", row_len, config.dimension)?;
        a.push(read_floats(buf, row_len)?);
    }

    let num_bits = read_len(buf, "bit count")?;
    expect_eq("bit count", num_bits, config.capacity)?;
    let word_count = num_bits.div_ceil(WORD_BITS);
    need(buf, word_count * SHORT)?;
    let words = (0..word_count).map(|_| buf.get_i16() as u16).collect();

    let params = ProjectionParams::new(a, b).map_err(|e| Error::Corrupt(e.to_string()))?;
    let bits = BitTable::from_words(num_bits, words).map_err(|e| Error::Corrupt(e.to_string()))?;
    Ok(LshTable::new(params, bits))
}

fn need<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Error::Truncated {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

fn read_len<B: Buf>(buf: &mut B, what: &str) -> Result<usize> {
    need(buf, INT)?;
    let n = buf.get_i32();
    usize::try_from(n).map_err(|_| Error::Corrupt(format!("negative {what}: {n}")))
}

fn read_floats<B: Buf>(buf: &mut B, n: usize) -> Result<Vec<f32>> {
    need(buf, n * FLOAT)?;
    Ok((0..n).map(|_| buf.get_f32()).collect())
}

fn expect_eq(what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::Corrupt(format!(
            "{what} {got} differs from configured {expected}"
        )));
    }
    Ok(())
}
