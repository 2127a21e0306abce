//! Array payload codec.
//!
//! Wire layout: one u64 per row holding the cumulative element count through
//! that row, then the concatenated element payload. `[[1],[43,65],[],[...]]`
//! produces offsets `[1, 3, 3, 6]`.

use crate::column::{numeric, ColumnData};
use crate::types::Type;
use crate::wire::{DecodeError, DecodeResult};
use crate::{Error, Result};
use bytes::BytesMut;

/// Append the offsets array and the flattened element payload.
pub fn save(
    offsets: &[u64],
    values: &ColumnData,
    item_type: &Type,
    buffer: &mut BytesMut,
) -> Result<()> {
    let total = offsets.last().copied().unwrap_or(0);
    if total as usize != values.len() {
        return Err(Error::Validation(format!(
            "Array offsets cover {} elements but payload has {}",
            total,
            values.len()
        )));
    }
    numeric::save_slice(offsets, buffer);
    values.save_to_buffer(item_type, buffer)
}

/// Read `rows` offsets and the flattened element payload they describe.
pub fn load(
    buffer: &mut &[u8],
    item_type: &Type,
    rows: usize,
) -> DecodeResult<(Vec<u64>, ColumnData)> {
    let offsets = numeric::load_vec::<u64>(buffer, rows)?;

    let mut previous = 0u64;
    for &offset in &offsets {
        if offset < previous {
            return Err(DecodeError::Corrupt(Error::Protocol(format!(
                "Array offsets are not monotonic: {} after {}",
                offset, previous
            ))));
        }
        previous = offset;
    }

    let total = offsets.last().copied().unwrap_or(0) as usize;
    let values = ColumnData::load_from_buffer(item_type, buffer, total)?;
    Ok((offsets, values))
}

/// Extend `offsets` with `other`, rebasing on the current total. Used by
/// same-type column merge.
pub fn merge_offsets(offsets: &mut Vec<u64>, other: &[u64]) {
    let base = offsets.last().copied().unwrap_or(0);
    offsets.extend(other.iter().map(|o| base + o));
}
