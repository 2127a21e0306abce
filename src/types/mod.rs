//! The ClickHouse column type system.
//!
//! [`Type`] is a recursive descriptor with a textual form identical to the
//! server's (`Nullable(UInt32)`, `Array(Enum8('hi' = -1, 'bye' = 5))`,
//! `DateTime64(3, 'GMT')`, ...). The descriptor drives every column
//! encode/decode in [`crate::column`].
//!
//! Nesting rules enforced here and by the parser:
//! - `Nullable` is never nested inside `Nullable`;
//! - `Array` and `Map` must not contain `Nullable`;
//! - `Map` supports only `(String, String)`;
//! - `Nullable(Array(..))` is accepted.

mod parser;

pub use parser::parse_type_name;

use crate::{Error, Result};
use std::fmt;

/// A ClickHouse column type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// 32-bit IEEE 754 floating-point number.
    Float32,
    /// 64-bit IEEE 754 floating-point number.
    Float64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Universally unique identifier, 16 bytes on the wire with both halves
    /// byte-swapped.
    Uuid,
    /// Variable-length string, varint length prefix per value.
    String,
    /// Fixed-length string of the given byte width, NUL padded.
    FixedString(usize),
    /// Boolean, stored as a single byte.
    Bool,
    /// Days since the Unix epoch as u16.
    Date,
    /// Days since the Unix epoch as i32.
    Date32,
    /// Seconds since the Unix epoch as u32, with an optional display
    /// timezone.
    DateTime(Option<String>),
    /// Count of 10^-precision seconds since the Unix epoch as i64, with an
    /// optional display timezone.
    DateTime64(u32, Option<String>),
    /// Enumeration stored as i8 codes with a name map.
    Enum8(Vec<(String, i8)>),
    /// Enumeration stored as i16 codes with a name map.
    Enum16(Vec<(String, i16)>),
    /// Variable-length array of the element type.
    Array(Box<Type>),
    /// Nullable wrapper around the nested type.
    Nullable(Box<Type>),
    /// Key-value map; only `(String, String)` is supported.
    Map(Box<Type>, Box<Type>),
}

impl Type {
    /// Parse a descriptor from the server's textual form.
    pub fn parse(name: &str) -> Result<Type> {
        parse_type_name(name)
    }

    /// Creates an `Array(item)` descriptor, rejecting nullable elements.
    pub fn array(item: Type) -> Result<Type> {
        if matches!(item, Type::Nullable(_)) {
            return Err(Error::TypeParse(
                "Array cannot contain Nullable".to_string(),
            ));
        }
        Ok(Type::Array(Box::new(item)))
    }

    /// Creates a `Nullable(nested)` descriptor, rejecting double nesting.
    pub fn nullable(nested: Type) -> Result<Type> {
        if matches!(nested, Type::Nullable(_)) {
            return Err(Error::TypeParse(
                "Nullable cannot be nested inside Nullable".to_string(),
            ));
        }
        Ok(Type::Nullable(Box::new(nested)))
    }

    /// Creates the `Map(String, String)` descriptor.
    pub fn map_string_string() -> Type {
        Type::Map(Box::new(Type::String), Box::new(Type::String))
    }

    /// Looks up an enum code by name.
    pub fn enum_value(&self, name: &str) -> Option<i16> {
        match self {
            Type::Enum8(items) => items
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v as i16),
            Type::Enum16(items) => {
                items.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
            }
            _ => None,
        }
    }

    /// Looks up an enum name by code.
    pub fn enum_name(&self, value: i16) -> Option<&str> {
        match self {
            Type::Enum8(items) => items
                .iter()
                .find(|(_, v)| *v as i16 == value)
                .map(|(n, _)| n.as_str()),
            Type::Enum16(items) => items
                .iter()
                .find(|(_, v)| *v == value)
                .map(|(n, _)| n.as_str()),
            _ => None,
        }
    }
}

fn write_enum_items<V: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[(String, V)],
) -> fmt::Result {
    for (i, (name, value)) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{}' = {}", name, value)?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Float32 => write!(f, "Float32"),
            Type::Float64 => write!(f, "Float64"),
            Type::Int8 => write!(f, "Int8"),
            Type::Int16 => write!(f, "Int16"),
            Type::Int32 => write!(f, "Int32"),
            Type::Int64 => write!(f, "Int64"),
            Type::UInt8 => write!(f, "UInt8"),
            Type::UInt16 => write!(f, "UInt16"),
            Type::UInt32 => write!(f, "UInt32"),
            Type::UInt64 => write!(f, "UInt64"),
            Type::Uuid => write!(f, "UUID"),
            Type::String => write!(f, "String"),
            Type::FixedString(len) => write!(f, "FixedString({})", len),
            Type::Bool => write!(f, "Bool"),
            Type::Date => write!(f, "Date"),
            Type::Date32 => write!(f, "Date32"),
            Type::DateTime(None) => write!(f, "DateTime"),
            Type::DateTime(Some(tz)) => write!(f, "DateTime('{}')", tz),
            Type::DateTime64(precision, None) => {
                write!(f, "DateTime64({})", precision)
            }
            Type::DateTime64(precision, Some(tz)) => {
                write!(f, "DateTime64({}, '{}')", precision, tz)
            }
            Type::Enum8(items) => {
                write!(f, "Enum8(")?;
                write_enum_items(f, items)?;
                write!(f, ")")
            }
            Type::Enum16(items) => {
                write!(f, "Enum16(")?;
                write_enum_items(f, items)?;
                write!(f, ")")
            }
            Type::Array(item) => write!(f, "Array({})", item),
            Type::Nullable(nested) => write!(f, "Nullable({})", nested),
            Type::Map(key, value) => write!(f, "Map({}, {})", key, value),
        }
    }
}
