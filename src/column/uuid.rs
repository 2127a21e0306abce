//! UUID payload codec.
//!
//! 16 bytes per value; the wire layout reverses each 8-byte half of the
//! canonical big-endian form. The swap lives in [`crate::wire`] so raw
//! wire bytes never reach callers.

use crate::wire::{self, DecodeResult};
use bytes::BytesMut;
use uuid::Uuid;

/// Append UUIDs in the server's byte-swapped layout.
pub fn save_uuids(values: &[Uuid], buffer: &mut BytesMut) {
    buffer.reserve(values.len() * 16);
    for value in values {
        wire::write_uuid(buffer, value);
    }
}

/// Read `rows` UUIDs, undoing the byte swap.
pub fn load_uuids(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<Uuid>> {
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(wire::read_uuid(buffer)?);
    }
    Ok(values)
}
