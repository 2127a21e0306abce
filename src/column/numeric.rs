//! Fixed-width scalar codecs: integers, floats, and Bool.
//!
//! All scalar payloads are densely packed little-endian vectors.

use crate::wire::{DecodeError, DecodeResult};
use bytes::{Buf, BufMut, BytesMut};

/// Types that serialize as a fixed number of little-endian bytes.
pub trait FixedSize: Sized + Copy + Send + Sync + 'static {
    /// Number of bytes one value occupies on the wire.
    const WIDTH: usize;

    /// Read one value from the cursor; the caller has checked the length.
    fn read_from(buffer: &mut &[u8]) -> Self;

    /// Append one value to the buffer.
    fn write_to(&self, buffer: &mut BytesMut);
}

macro_rules! impl_fixed_size {
    ($type:ty, $width:expr, $get:ident, $put:ident) => {
        impl FixedSize for $type {
            const WIDTH: usize = $width;

            fn read_from(buffer: &mut &[u8]) -> Self {
                buffer.$get()
            }

            fn write_to(&self, buffer: &mut BytesMut) {
                buffer.$put(*self);
            }
        }
    };
}

impl_fixed_size!(u8, 1, get_u8, put_u8);
impl_fixed_size!(u16, 2, get_u16_le, put_u16_le);
impl_fixed_size!(u32, 4, get_u32_le, put_u32_le);
impl_fixed_size!(u64, 8, get_u64_le, put_u64_le);
impl_fixed_size!(i8, 1, get_i8, put_i8);
impl_fixed_size!(i16, 2, get_i16_le, put_i16_le);
impl_fixed_size!(i32, 4, get_i32_le, put_i32_le);
impl_fixed_size!(i64, 8, get_i64_le, put_i64_le);
impl_fixed_size!(f32, 4, get_f32_le, put_f32_le);
impl_fixed_size!(f64, 8, get_f64_le, put_f64_le);

/// Append a scalar vector to the buffer.
pub fn save_slice<T: FixedSize>(values: &[T], buffer: &mut BytesMut) {
    buffer.reserve(values.len() * T::WIDTH);
    for value in values {
        value.write_to(buffer);
    }
}

/// Read `rows` scalars from the cursor.
pub fn load_vec<T: FixedSize>(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<T>> {
    if buffer.len() < rows * T::WIDTH {
        return Err(DecodeError::Incomplete);
    }
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(T::read_from(buffer));
    }
    Ok(values)
}

/// Append booleans as single bytes (1 = true).
pub fn save_bools(values: &[bool], buffer: &mut BytesMut) {
    buffer.reserve(values.len());
    for &value in values {
        buffer.put_u8(u8::from(value));
    }
}

/// Read `rows` booleans; any non-zero byte is true.
pub fn load_bools(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<bool>> {
    if buffer.len() < rows {
        return Err(DecodeError::Incomplete);
    }
    let mut values = Vec::with_capacity(rows);
    for _ in 0..rows {
        values.push(buffer.get_u8() != 0);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip<T: FixedSize + PartialEq + std::fmt::Debug>(values: Vec<T>) {
        let mut buf = BytesMut::new();
        save_slice(&values, &mut buf);
        assert_eq!(buf.len(), values.len() * T::WIDTH);

        let mut cursor = &buf[..];
        let decoded = load_vec::<T>(&mut cursor, values.len()).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_scalar_roundtrips() {
        roundtrip(vec![0u8, 1, 255]);
        roundtrip(vec![-1i32, 0, i32::MAX, i32::MIN]);
        roundtrip(vec![u64::MAX, 0, 42]);
        roundtrip(vec![1.5f64, -0.25, f64::MAX]);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = BytesMut::new();
        save_slice(&[0x12345678u32], &mut buf);
        assert_eq!(&buf[..], &[0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_underflow_is_incomplete() {
        let bytes = [0u8; 7];
        let mut cursor = &bytes[..];
        assert!(matches!(
            load_vec::<u64>(&mut cursor, 1),
            Err(DecodeError::Incomplete)
        ));
    }

    #[test]
    fn test_bool_bytes() {
        let mut buf = BytesMut::new();
        save_bools(&[true, false, true], &mut buf);
        assert_eq!(&buf[..], &[1, 0, 1]);

        let mut cursor = &buf[..];
        assert_eq!(
            load_bools(&mut cursor, 3).unwrap(),
            vec![true, false, true]
        );
    }

    proptest! {
        #[test]
        fn prop_i64_roundtrip(values in proptest::collection::vec(any::<i64>(), 0..64)) {
            roundtrip(values);
        }

        #[test]
        fn prop_f32_roundtrip(values in proptest::collection::vec(any::<u32>(), 0..64)) {
            // Bit-exact round-trip, NaN payloads included.
            let floats: Vec<f32> = values.iter().map(|&b| f32::from_bits(b)).collect();
            let mut buf = BytesMut::new();
            save_slice(&floats, &mut buf);
            let mut cursor = &buf[..];
            let decoded = load_vec::<f32>(&mut cursor, floats.len()).unwrap();
            for (a, b) in floats.iter().zip(&decoded) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }
}
