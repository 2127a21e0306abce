//! Map payload codec.
//!
//! `Map(String, String)` mirrors the array layout: cumulative pair counts
//! per row, then the flattened keys, then the flattened values.

use crate::column::{numeric, ColumnData};
use crate::types::Type;
use crate::wire::{DecodeError, DecodeResult};
use crate::{Error, Result};
use bytes::BytesMut;

/// Append the offsets array, flattened keys, and flattened values.
pub fn save(
    offsets: &[u64],
    keys: &ColumnData,
    values: &ColumnData,
    key_type: &Type,
    value_type: &Type,
    buffer: &mut BytesMut,
) -> Result<()> {
    let total = offsets.last().copied().unwrap_or(0) as usize;
    if total != keys.len() || total != values.len() {
        return Err(Error::Validation(format!(
            "Map offsets cover {} pairs but have {} keys and {} values",
            total,
            keys.len(),
            values.len()
        )));
    }
    numeric::save_slice(offsets, buffer);
    keys.save_to_buffer(key_type, buffer)?;
    values.save_to_buffer(value_type, buffer)
}

/// Read `rows` offsets and the flattened key and value payloads.
pub fn load(
    buffer: &mut &[u8],
    key_type: &Type,
    value_type: &Type,
    rows: usize,
) -> DecodeResult<(Vec<u64>, ColumnData, ColumnData)> {
    let offsets = numeric::load_vec::<u64>(buffer, rows)?;

    let mut previous = 0u64;
    for &offset in &offsets {
        if offset < previous {
            return Err(DecodeError::Corrupt(Error::Protocol(format!(
                "Map offsets are not monotonic: {} after {}",
                offset, previous
            ))));
        }
        previous = offset;
    }

    let total = offsets.last().copied().unwrap_or(0) as usize;
    let keys = ColumnData::load_from_buffer(key_type, buffer, total)?;
    let values = ColumnData::load_from_buffer(value_type, buffer, total)?;
    Ok((offsets, keys, values))
}

/// Re-exported offset rebase shared with arrays.
pub use crate::column::array::merge_offsets;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_roundtrip() {
        let data = ColumnData::from(vec![
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())],
            vec![],
            vec![("c".to_string(), "3".to_string())],
        ]);
        let (offsets, keys, values) = match &data {
            ColumnData::Map { offsets, keys, values } => {
                (offsets.clone(), (**keys).clone(), (**values).clone())
            }
            _ => unreachable!(),
        };
        assert_eq!(offsets, vec![2, 2, 3]);

        let mut buf = BytesMut::new();
        save(&offsets, &keys, &values, &Type::String, &Type::String, &mut buf).unwrap();

        let mut cursor = &buf[..];
        let (decoded_offsets, decoded_keys, decoded_values) =
            load(&mut cursor, &Type::String, &Type::String, 3).unwrap();
        assert_eq!(decoded_offsets, offsets);
        assert_eq!(decoded_keys, keys);
        assert_eq!(decoded_values, values);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_pair_count_mismatch_rejected() {
        let keys = ColumnData::from(vec!["a".to_string()]);
        let values = ColumnData::from(vec!["1".to_string(), "2".to_string()]);
        let mut buf = BytesMut::new();
        assert!(save(&[1], &keys, &values, &Type::String, &Type::String, &mut buf).is_err());
    }
}
