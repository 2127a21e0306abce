//! Nullable payload codec.
//!
//! Wire layout: one flag byte per row (1 = null, 0 = present), then the full
//! nested payload for every row. Null slots carry the nested type's default
//! value so the payload length always equals the row count.

use crate::column::ColumnData;
use crate::types::Type;
use crate::wire::{DecodeError, DecodeResult};
use crate::{Error, Result};
use bytes::{BufMut, BytesMut};

/// Append the null mask and the nested payload.
pub fn save(
    mask: &[u8],
    values: &ColumnData,
    nested_type: &Type,
    buffer: &mut BytesMut,
) -> Result<()> {
    if mask.len() != values.len() {
        return Err(Error::Validation(format!(
            "Nullable mask has {} flags for {} values",
            mask.len(),
            values.len()
        )));
    }
    buffer.put_slice(mask);
    values.save_to_buffer(nested_type, buffer)
}

/// Read `rows` null flags followed by the full nested payload.
pub fn load(
    buffer: &mut &[u8],
    nested_type: &Type,
    rows: usize,
) -> DecodeResult<(Vec<u8>, ColumnData)> {
    if buffer.len() < rows {
        return Err(DecodeError::Incomplete);
    }
    let mask = buffer[..rows].to_vec();
    bytes::Buf::advance(buffer, rows);

    for &flag in &mask {
        if flag > 1 {
            return Err(DecodeError::Corrupt(Error::Protocol(format!(
                "Invalid null flag: {}",
                flag
            ))));
        }
    }

    let values = ColumnData::load_from_buffer(nested_type, buffer, rows)?;
    Ok((mask, values))
}
