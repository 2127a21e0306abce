//! Wire format primitives: varints, length-prefixed strings, fixed strings,
//! little-endian scalars, and the UUID byte-swap.
//!
//! All readers work on a `&mut &[u8]` cursor and distinguish a buffer that
//! is merely short ([`DecodeError::Incomplete`] — the caller waits for more
//! bytes) from data that can never parse ([`DecodeError::Corrupt`]). The
//! streaming packet decoder parses on a copy of the cursor and only commits
//! consumed bytes on success, so `Incomplete` is cheap to hit mid-frame.

use crate::Error;
use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

/// Longest accepted varint encoding. The protocol never carries values that
/// need more than 63 bits.
pub const MAX_VARINT_LEN: usize = 9;

/// Strings above this length are rejected as malformed.
pub const MAX_STRING_LEN: usize = 0x00FF_FFFF;

/// Failure mode of a wire-level read.
#[derive(Debug)]
pub enum DecodeError {
    /// The buffer ends mid-value; retry once more bytes arrive.
    Incomplete,
    /// The bytes can never form a valid value.
    Corrupt(Error),
}

impl From<Error> for DecodeError {
    fn from(e: Error) -> Self {
        DecodeError::Corrupt(e)
    }
}

/// Result of a wire-level read.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

fn corrupt(msg: impl Into<String>) -> DecodeError {
    DecodeError::Corrupt(Error::Protocol(msg.into()))
}

/// Read a varint-encoded u64: 7 data bits per byte, little-endian groups,
/// top bit set on all but the last byte.
pub fn read_varint64(buffer: &mut &[u8]) -> DecodeResult<u64> {
    let mut result: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        if buffer.is_empty() {
            return Err(DecodeError::Incomplete);
        }
        let byte = buffer.get_u8();
        result |= ((byte & 0x7F) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(corrupt("varint longer than 9 bytes"))
}

/// Write a varint-encoded u64 (at most 9 bytes).
pub fn write_varint64(buffer: &mut BytesMut, mut value: u64) {
    for _ in 0..MAX_VARINT_LEN {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buffer.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read a length-prefixed UTF-8 string.
pub fn read_string(buffer: &mut &[u8]) -> DecodeResult<String> {
    let len = read_varint64(buffer)? as usize;

    if len > MAX_STRING_LEN {
        return Err(corrupt(format!("String length too large: {}", len)));
    }
    if buffer.len() < len {
        return Err(DecodeError::Incomplete);
    }

    let s = std::str::from_utf8(&buffer[..len])
        .map_err(|e| corrupt(format!("Invalid UTF-8 in string: {}", e)))?
        .to_string();
    buffer.advance(len);
    Ok(s)
}

/// Write a length-prefixed string.
pub fn write_string(buffer: &mut BytesMut, s: &str) {
    write_varint64(buffer, s.len() as u64);
    buffer.put_slice(s.as_bytes());
}

/// Write a fixed-width string: at most `len` UTF-8 bytes, zero-padded.
///
/// Truncation is byte-wise and may split a multi-byte code point; the
/// server stores whatever bytes arrive.
pub fn write_fixed_string(buffer: &mut BytesMut, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(len);
    buffer.put_slice(&bytes[..take]);
    if take < len {
        buffer.put_bytes(0, len - take);
    }
}

/// Read a fixed-width string of exactly `len` bytes, truncated at the first
/// NUL (the write side pads with NUL).
pub fn read_fixed_string(buffer: &mut &[u8], len: usize) -> DecodeResult<String> {
    if buffer.len() < len {
        return Err(DecodeError::Incomplete);
    }
    let bytes = &buffer[..len];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
    let s = String::from_utf8_lossy(&bytes[..end]).into_owned();
    buffer.advance(len);
    Ok(s)
}

/// Read a u8 from the cursor.
pub fn read_u8(buffer: &mut &[u8]) -> DecodeResult<u8> {
    if buffer.is_empty() {
        return Err(DecodeError::Incomplete);
    }
    Ok(buffer.get_u8())
}

/// Read a little-endian i32 from the cursor.
pub fn read_i32(buffer: &mut &[u8]) -> DecodeResult<i32> {
    if buffer.len() < 4 {
        return Err(DecodeError::Incomplete);
    }
    Ok(buffer.get_i32_le())
}

/// Read a little-endian u32 from the cursor.
pub fn read_u32(buffer: &mut &[u8]) -> DecodeResult<u32> {
    if buffer.len() < 4 {
        return Err(DecodeError::Incomplete);
    }
    Ok(buffer.get_u32_le())
}

/// Write a UUID in the server's native layout: each 8-byte half of the
/// canonical big-endian form is byte-reversed on the wire.
pub fn write_uuid(buffer: &mut BytesMut, uuid: &Uuid) {
    let (high, low) = uuid.as_u64_pair();
    buffer.put_u64_le(high);
    buffer.put_u64_le(low);
}

/// Read a UUID, undoing the per-half byte swap.
pub fn read_uuid(buffer: &mut &[u8]) -> DecodeResult<Uuid> {
    if buffer.len() < 16 {
        return Err(DecodeError::Incomplete);
    }
    let high = buffer.get_u64_le();
    let low = buffer.get_u64_le();
    Ok(Uuid::from_u64_pair(high, low))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip_varint(value: u64) -> u64 {
        let mut buf = BytesMut::new();
        write_varint64(&mut buf, value);
        let mut cursor = &buf[..];
        let decoded = read_varint64(&mut cursor).unwrap();
        assert!(cursor.is_empty(), "cursor fully consumed");
        decoded
    }

    #[test]
    fn test_varint_roundtrip() {
        for value in [0u64, 1, 127, 128, 255, 256, 16383, 16384, 65535, (1 << 62) + 17] {
            assert_eq!(roundtrip_varint(value), value);
        }
    }

    #[test]
    fn test_varint_encoded_lengths() {
        for (value, expected_len) in [
            (0u64, 1),
            (127, 1),
            (128, 2),
            ((1 << 14) - 1, 2),
            (1 << 14, 3),
            ((1 << 62) + 1, 9),
        ] {
            let mut buf = BytesMut::new();
            write_varint64(&mut buf, value);
            assert_eq!(buf.len(), expected_len, "length for {}", value);
        }
    }

    #[test]
    fn test_varint_incomplete() {
        let bytes = [0x80u8, 0x80];
        let mut cursor = &bytes[..];
        assert!(matches!(
            read_varint64(&mut cursor),
            Err(DecodeError::Incomplete)
        ));
    }

    #[test]
    fn test_varint_overlong_is_corrupt() {
        let bytes = [0xFFu8; 10];
        let mut cursor = &bytes[..];
        assert!(matches!(
            read_varint64(&mut cursor),
            Err(DecodeError::Corrupt(_))
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        for s in ["", "hello", "мир", "🦀", "line\nbreak"] {
            let mut buf = BytesMut::new();
            write_string(&mut buf, s);
            let mut cursor = &buf[..];
            assert_eq!(read_string(&mut cursor).unwrap(), s);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_string_length_cap() {
        let mut buf = BytesMut::new();
        write_varint64(&mut buf, (MAX_STRING_LEN + 1) as u64);
        let mut cursor = &buf[..];
        assert!(matches!(
            read_string(&mut cursor),
            Err(DecodeError::Corrupt(_))
        ));
    }

    #[test]
    fn test_string_partial_is_incomplete() {
        let mut buf = BytesMut::new();
        write_varint64(&mut buf, 10);
        buf.put_slice(b"short");
        let mut cursor = &buf[..];
        assert!(matches!(
            read_string(&mut cursor),
            Err(DecodeError::Incomplete)
        ));
    }

    #[test]
    fn test_fixed_string_truncates_multibyte() {
        // "🎅☃🧪" is 11 bytes of UTF-8; only the first 7 survive, which is
        // exactly "🎅☃" with no padding.
        let mut buf = BytesMut::new();
        write_fixed_string(&mut buf, "🎅☃🧪", 7);
        assert_eq!(buf.len(), 7);
        assert_eq!(&buf[..], "🎅☃".as_bytes());

        let mut cursor = &buf[..];
        assert_eq!(read_fixed_string(&mut cursor, 7).unwrap(), "🎅☃");
    }

    #[test]
    fn test_fixed_string_pads_and_strips() {
        let mut buf = BytesMut::new();
        write_fixed_string(&mut buf, "a", 7);
        assert_eq!(&buf[..], b"a\0\0\0\0\0\0");

        let mut cursor = &buf[..];
        assert_eq!(read_fixed_string(&mut cursor, 7).unwrap(), "a");
    }

    #[test]
    fn test_fixed_string_exact_width() {
        let mut buf = BytesMut::new();
        write_fixed_string(&mut buf, "awfawfawf", 7);
        assert_eq!(&buf[..], b"awfawfa");

        let mut cursor = &buf[..];
        assert_eq!(read_fixed_string(&mut cursor, 7).unwrap(), "awfawfa");
    }

    #[test]
    fn test_uuid_swap() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let mut buf = BytesMut::new();
        write_uuid(&mut buf, &uuid);

        // Each canonical 8-byte half arrives byte-reversed.
        let canonical = uuid.as_bytes();
        let mut expected = Vec::new();
        expected.extend(canonical[..8].iter().rev());
        expected.extend(canonical[8..].iter().rev());
        assert_eq!(&buf[..], &expected[..]);

        let mut cursor = &buf[..];
        assert_eq!(read_uuid(&mut cursor).unwrap(), uuid);
    }

    proptest! {
        #[test]
        fn prop_varint_roundtrip(value in 0u64..(1 << 63)) {
            prop_assert_eq!(roundtrip_varint(value), value);
        }

        #[test]
        fn prop_string_roundtrip(s in "\\PC{0,64}") {
            let mut buf = BytesMut::new();
            write_string(&mut buf, &s);
            let mut cursor = &buf[..];
            prop_assert_eq!(read_string(&mut cursor).unwrap(), s);
        }
    }
}
