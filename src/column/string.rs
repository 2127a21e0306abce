//! String and FixedString payload codecs.
//!
//! `String` values are varint-length-prefixed; `FixedString(n)` values are
//! exactly `n` bytes, truncated byte-wise on write (which may split a
//! multi-byte code point) and NUL-stripped on read.

use crate::wire::{self, DecodeResult};
use bytes::BytesMut;

/// Append variable-length strings to the buffer.
pub fn save_strings(values: &[String], buffer: &mut BytesMut) {
    for value in values {
        wire::write_string(buffer, value);
    }
}

/// Read `rows` variable-length strings.
pub fn load_strings(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<String>> {
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(wire::read_string(buffer)?);
    }
    Ok(values)
}

/// Append fixed-width strings of `width` bytes each.
pub fn save_fixed_strings(values: &[String], width: usize, buffer: &mut BytesMut) {
    for value in values {
        wire::write_fixed_string(buffer, value, width);
    }
}

/// Read `rows` fixed-width strings of `width` bytes each.
pub fn load_fixed_strings(
    buffer: &mut &[u8],
    width: usize,
    rows: usize,
) -> DecodeResult<Vec<String>> {
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(wire::read_fixed_string(buffer, width)?);
    }
    Ok(values)
}
