//! Key decoding: opaque key bytes to a dense `f64` vector.
//!
//! Two encodings are supported, each as its own codec:
//! - [`FieldStreamCodec`]: a stream of length-prefixed fields
//!   (`u16` length, value, one padding byte). 4-byte values are big-endian `i32`,
//!   8-byte values are big-endian `f64`, any other declared length is followed by
//!   a single `i8` value byte. A malformed stream falls back to one component per byte.
//! - [`BitStringCodec`]: an ASCII string of `'0'`/`'1'` characters, one
//!   `0.0`/`1.0` component per character.
//!
//! Decoding never fails. All cursor state is local to the call.

use bytes::{Buf, BufMut};
use serde::Deserialize;
use tracing::trace;

/// Anything that can turn key bytes into a vector.
///
/// Implemented by both codecs and by any `Fn(&[u8]) -> Vec<f64>`, so hosts can
/// inject their own record-to-vector extraction.
pub trait VectorSource: Send + Sync {
    /// Decode `key` into a vector.
    fn vector(&self, key: &[u8]) -> Vec<f64>;
}

impl<F> VectorSource for F
where
    F: Fn(&[u8]) -> Vec<f64> + Send + Sync,
{
    fn vector(&self, key: &[u8]) -> Vec<f64> {
        self(key)
    }
}

/// Selects one of the built-in codecs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Length-prefixed field stream with byte-by-byte fallback.
    #[default]
    FieldStream,
    /// ASCII bit string.
    BitString,
}

impl CodecKind {
    /// Decode with the selected codec.
    pub fn decode(self, key: &[u8]) -> Vec<f64> {
        match self {
            CodecKind::FieldStream => decode_fields(key),
            CodecKind::BitString => decode_bits(key),
        }
    }
}

impl VectorSource for CodecKind {
    fn vector(&self, key: &[u8]) -> Vec<f64> {
        self.decode(key)
    }
}

/// Codec for length-prefixed field streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStreamCodec;

impl FieldStreamCodec {
    /// Encode `values` as a field stream of 8-byte floats.
    pub fn encode(values: &[f64]) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len() * 11);
        for &v in values {
            out.put_u16(8);
            out.put_f64(v);
            out.put_u8(0);
        }
        out
    }

    /// Encode `values` as a field stream of 4-byte integers.
    pub fn encode_ints(values: &[i32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(values.len() * 7);
        for &v in values {
            out.put_u16(4);
            out.put_i32(v);
            out.put_u8(0);
        }
        out
    }
}

impl VectorSource for FieldStreamCodec {
    fn vector(&self, key: &[u8]) -> Vec<f64> {
        decode_fields(key)
    }
}

/// Codec for ASCII bit strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitStringCodec;

impl VectorSource for BitStringCodec {
    fn vector(&self, key: &[u8]) -> Vec<f64> {
        decode_bits(key)
    }
}

/// Decode a length-prefixed field stream, falling back to [`decode_bytes`].
pub fn decode_fields(key: &[u8]) -> Vec<f64> {
    if key.len() < 2 {
        return decode_bytes(key);
    }
    let first_len = u16::from_be_bytes([key[0], key[1]]) as usize;
    if first_len > key.len() - 2 {
        trace!(len = key.len(), first_len, "field stream rejected, decoding bytes");
        return decode_bytes(key);
    }
    match parse_fields(key) {
        Some(v) => v,
        None => {
            trace!(len = key.len(), "malformed field stream, decoding bytes");
            decode_bytes(key)
        }
    }
}

fn parse_fields(mut cur: &[u8]) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    while cur.has_remaining() {
        if cur.remaining() < 2 {
            return None;
        }
        let len = cur.get_u16() as usize;
        // 4 and 8 carry a full value; every other length carries one signed byte
        let width = match len {
            4 | 8 => len,
            _ => 1,
        };
        if cur.remaining() < width + 1 {
            return None;
        }
        let value = match len {
            4 => cur.get_i32() as f64,
            8 => cur.get_f64(),
            _ => cur.get_i8() as f64,
        };
        // padding
        cur.advance(1);
        out.push(value);
    }
    Some(out)
}

/// One component per byte, each byte read as an `i8`.
pub fn decode_bytes(key: &[u8]) -> Vec<f64> {
    key.iter().map(|&b| b as i8 as f64).collect()
}

/// One component per character: `'1'` is `1.0`, anything else `0.0`.
pub fn decode_bits(key: &[u8]) -> Vec<f64> {
    key.iter()
        .map(|&b| if b == b'1' { 1.0 } else { 0.0 })
        .collect()
}
