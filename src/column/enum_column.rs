//! Enum8/Enum16 payload codecs.
//!
//! Values travel as plain integer codes; the name map lives in the type
//! descriptor. Encoding a name that is not in the map is a caller error.

use crate::column::numeric;
use crate::types::Type;
use crate::wire::{DecodeError, DecodeResult};
use crate::{Error, Result};
use bytes::BytesMut;

/// Append enum names as their mapped codes (i8 for Enum8, i16 for Enum16).
pub fn save_names(values: &[String], enum_type: &Type, buffer: &mut BytesMut) -> Result<()> {
    match enum_type {
        Type::Enum8(_) => {
            let mut codes = Vec::with_capacity(values.len());
            for name in values {
                codes.push(lookup(enum_type, name)? as i8);
            }
            numeric::save_slice(&codes, buffer);
        }
        Type::Enum16(_) => {
            let mut codes = Vec::with_capacity(values.len());
            for name in values {
                codes.push(lookup(enum_type, name)?);
            }
            numeric::save_slice(&codes, buffer);
        }
        other => {
            return Err(Error::TypeMismatch {
                expected: "Enum8 or Enum16".to_string(),
                actual: other.to_string(),
            })
        }
    }
    Ok(())
}

/// Read `rows` enum codes and invert the map back to names.
pub fn load_names(
    buffer: &mut &[u8],
    enum_type: &Type,
    rows: usize,
) -> DecodeResult<Vec<String>> {
    let codes: Vec<i16> = match enum_type {
        Type::Enum8(_) => numeric::load_vec::<i8>(buffer, rows)?
            .into_iter()
            .map(|c| c as i16)
            .collect(),
        Type::Enum16(_) => numeric::load_vec::<i16>(buffer, rows)?,
        other => {
            return Err(DecodeError::Corrupt(Error::TypeMismatch {
                expected: "Enum8 or Enum16".to_string(),
                actual: other.to_string(),
            }))
        }
    };

    let mut names = Vec::with_capacity(rows);
    for code in codes {
        match enum_type.enum_name(code) {
            Some(name) => names.push(name.to_string()),
            None => {
                return Err(DecodeError::Corrupt(Error::Validation(format!(
                    "Enum code {} has no name in {}",
                    code, enum_type
                ))))
            }
        }
    }
    Ok(names)
}

fn lookup(enum_type: &Type, name: &str) -> Result<i16> {
    enum_type.enum_value(name).ok_or_else(|| {
        Error::Validation(format!("Enum name '{}' is not in {}", name, enum_type))
    })
}
