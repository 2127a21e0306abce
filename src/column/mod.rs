//! Column containers for the native protocol.
//!
//! [`ColumnData`] is a tagged container over homogeneous value vectors. The
//! concrete encoding of a container is chosen by the [`Type`] descriptor
//! passed to [`ColumnData::save_to_buffer`] /
//! [`ColumnData::load_from_buffer`]: one `String` container serializes as
//! `String`, `FixedString(n)`, or an enum family depending on the
//! descriptor, one `DateTime` container serializes as `DateTime` or
//! `DateTime64(p)`, and so on. [`Column`] pairs a container with its name
//! and descriptor.
//!
//! Nesting rules follow the type system: `Nullable` holds a flag mask plus
//! a full-length nested payload, `Array`/`Map` hold cumulative offsets plus
//! flattened payloads.

/// Array payload codec (`Array(T)`).
pub mod array;
/// Date and time payload codecs.
pub mod date;
/// Enum8/Enum16 payload codecs.
pub mod enum_column;
/// Map payload codec (`Map(String, String)`).
pub mod map;
/// Nullable payload codec.
pub mod nullable;
/// Fixed-width scalar codecs.
pub mod numeric;
/// String and FixedString payload codecs.
pub mod string;
/// UUID payload codec.
pub mod uuid;

use crate::types::Type;
use crate::wire::DecodeResult;
use crate::{Error, Result};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, Utc};

/// A homogeneous vector of column values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// 32-bit floats.
    Float32(Vec<f32>),
    /// 64-bit floats.
    Float64(Vec<f64>),
    /// Signed 8-bit integers.
    Int8(Vec<i8>),
    /// Signed 16-bit integers.
    Int16(Vec<i16>),
    /// Signed 32-bit integers.
    Int32(Vec<i32>),
    /// Signed 64-bit integers.
    Int64(Vec<i64>),
    /// Unsigned 8-bit integers.
    UInt8(Vec<u8>),
    /// Unsigned 16-bit integers.
    UInt16(Vec<u16>),
    /// Unsigned 32-bit integers.
    UInt32(Vec<u32>),
    /// Unsigned 64-bit integers.
    UInt64(Vec<u64>),
    /// Booleans, one byte each on the wire.
    Bool(Vec<bool>),
    /// Strings; also backs `FixedString` and the enum families (enum values
    /// surface as their names).
    String(Vec<String>),
    /// UUIDs.
    Uuid(Vec<::uuid::Uuid>),
    /// Calendar dates; backs both `Date` and `Date32`.
    Date(Vec<NaiveDate>),
    /// Timestamps; backs both `DateTime` and `DateTime64`.
    DateTime(Vec<DateTime<Utc>>),
    /// Nullable wrapper: flag mask (1 = null) plus a full-length nested
    /// payload with defaults in null slots.
    Nullable {
        /// One flag byte per row, 1 meaning null.
        mask: Vec<u8>,
        /// The nested payload, one value per row.
        values: Box<ColumnData>,
    },
    /// Array wrapper: cumulative element counts plus the flattened payload.
    Array {
        /// Cumulative element count through each row.
        offsets: Vec<u64>,
        /// All elements, concatenated.
        values: Box<ColumnData>,
    },
    /// Map wrapper: cumulative pair counts plus flattened keys and values.
    Map {
        /// Cumulative pair count through each row.
        offsets: Vec<u64>,
        /// All keys, concatenated.
        keys: Box<ColumnData>,
        /// All values, concatenated.
        values: Box<ColumnData>,
    },
}

impl ColumnData {
    /// Number of rows in the container.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::Uuid(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
            ColumnData::Nullable { mask, .. } => mask.len(),
            ColumnData::Array { offsets, .. } => offsets.len(),
            ColumnData::Map { offsets, .. } => offsets.len(),
        }
    }

    /// True when the container holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short variant label used in mismatch diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            ColumnData::Float32(_) => "Float32",
            ColumnData::Float64(_) => "Float64",
            ColumnData::Int8(_) => "Int8",
            ColumnData::Int16(_) => "Int16",
            ColumnData::Int32(_) => "Int32",
            ColumnData::Int64(_) => "Int64",
            ColumnData::UInt8(_) => "UInt8",
            ColumnData::UInt16(_) => "UInt16",
            ColumnData::UInt32(_) => "UInt32",
            ColumnData::UInt64(_) => "UInt64",
            ColumnData::Bool(_) => "Bool",
            ColumnData::String(_) => "String",
            ColumnData::Uuid(_) => "UUID",
            ColumnData::Date(_) => "Date",
            ColumnData::DateTime(_) => "DateTime",
            ColumnData::Nullable { .. } => "Nullable",
            ColumnData::Array { .. } => "Array",
            ColumnData::Map { .. } => "Map",
        }
    }

    /// True when this container can encode as `column_type`.
    pub fn matches(&self, column_type: &Type) -> bool {
        match (self, column_type) {
            (ColumnData::Float32(_), Type::Float32)
            | (ColumnData::Float64(_), Type::Float64)
            | (ColumnData::Int8(_), Type::Int8)
            | (ColumnData::Int16(_), Type::Int16)
            | (ColumnData::Int32(_), Type::Int32)
            | (ColumnData::Int64(_), Type::Int64)
            | (ColumnData::UInt8(_), Type::UInt8)
            | (ColumnData::UInt16(_), Type::UInt16)
            | (ColumnData::UInt32(_), Type::UInt32)
            | (ColumnData::UInt64(_), Type::UInt64)
            | (ColumnData::Bool(_), Type::Bool)
            | (ColumnData::Uuid(_), Type::Uuid)
            | (ColumnData::Date(_), Type::Date)
            | (ColumnData::Date(_), Type::Date32)
            | (ColumnData::DateTime(_), Type::DateTime(_))
            | (ColumnData::DateTime(_), Type::DateTime64(_, _)) => true,
            (
                ColumnData::String(_),
                Type::String | Type::FixedString(_) | Type::Enum8(_) | Type::Enum16(_),
            ) => true,
            (ColumnData::Nullable { values, .. }, Type::Nullable(inner)) => {
                values.matches(inner)
            }
            (ColumnData::Array { values, .. }, Type::Array(item)) => values.matches(item),
            (ColumnData::Map { keys, values, .. }, Type::Map(key, value)) => {
                keys.matches(key) && values.matches(value)
            }
            _ => false,
        }
    }

    /// Provisional descriptor derived from the container shape. Used for
    /// user-built columns until the server-declared type replaces it.
    pub fn derive_type(&self) -> Type {
        match self {
            ColumnData::Float32(_) => Type::Float32,
            ColumnData::Float64(_) => Type::Float64,
            ColumnData::Int8(_) => Type::Int8,
            ColumnData::Int16(_) => Type::Int16,
            ColumnData::Int32(_) => Type::Int32,
            ColumnData::Int64(_) => Type::Int64,
            ColumnData::UInt8(_) => Type::UInt8,
            ColumnData::UInt16(_) => Type::UInt16,
            ColumnData::UInt32(_) => Type::UInt32,
            ColumnData::UInt64(_) => Type::UInt64,
            ColumnData::Bool(_) => Type::Bool,
            ColumnData::String(_) => Type::String,
            ColumnData::Uuid(_) => Type::Uuid,
            ColumnData::Date(_) => Type::Date,
            ColumnData::DateTime(_) => Type::DateTime(None),
            ColumnData::Nullable { values, .. } => {
                Type::Nullable(Box::new(values.derive_type()))
            }
            ColumnData::Array { values, .. } => Type::Array(Box::new(values.derive_type())),
            ColumnData::Map { .. } => Type::map_string_string(),
        }
    }

    /// Append `other` to this container; both must be the same variant.
    pub fn merge(&mut self, other: ColumnData) -> Result<()> {
        match (self, other) {
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend(b),
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend(b),
            (ColumnData::UInt8(a), ColumnData::UInt8(b)) => a.extend(b),
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a.extend(b),
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a.extend(b),
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a.extend(b),
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend(b),
            (ColumnData::String(a), ColumnData::String(b)) => a.extend(b),
            (ColumnData::Uuid(a), ColumnData::Uuid(b)) => a.extend(b),
            (ColumnData::Date(a), ColumnData::Date(b)) => a.extend(b),
            (ColumnData::DateTime(a), ColumnData::DateTime(b)) => a.extend(b),
            (
                ColumnData::Nullable { mask, values },
                ColumnData::Nullable {
                    mask: other_mask,
                    values: other_values,
                },
            ) => {
                mask.extend(other_mask);
                values.merge(*other_values)?;
            }
            (
                ColumnData::Array { offsets, values },
                ColumnData::Array {
                    offsets: other_offsets,
                    values: other_values,
                },
            ) => {
                array::merge_offsets(offsets, &other_offsets);
                values.merge(*other_values)?;
            }
            (
                ColumnData::Map {
                    offsets,
                    keys,
                    values,
                },
                ColumnData::Map {
                    offsets: other_offsets,
                    keys: other_keys,
                    values: other_values,
                },
            ) => {
                map::merge_offsets(offsets, &other_offsets);
                keys.merge(*other_keys)?;
                values.merge(*other_values)?;
            }
            (this, other) => {
                return Err(Error::TypeMismatch {
                    expected: this.variant_name().to_string(),
                    actual: other.variant_name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Serialize the payload as `column_type`.
    pub fn save_to_buffer(&self, column_type: &Type, buffer: &mut BytesMut) -> Result<()> {
        match (column_type, self) {
            (Type::Float32, ColumnData::Float32(v)) => numeric::save_slice(v, buffer),
            (Type::Float64, ColumnData::Float64(v)) => numeric::save_slice(v, buffer),
            (Type::Int8, ColumnData::Int8(v)) => numeric::save_slice(v, buffer),
            (Type::Int16, ColumnData::Int16(v)) => numeric::save_slice(v, buffer),
            (Type::Int32, ColumnData::Int32(v)) => numeric::save_slice(v, buffer),
            (Type::Int64, ColumnData::Int64(v)) => numeric::save_slice(v, buffer),
            (Type::UInt8, ColumnData::UInt8(v)) => numeric::save_slice(v, buffer),
            (Type::UInt16, ColumnData::UInt16(v)) => numeric::save_slice(v, buffer),
            (Type::UInt32, ColumnData::UInt32(v)) => numeric::save_slice(v, buffer),
            (Type::UInt64, ColumnData::UInt64(v)) => numeric::save_slice(v, buffer),
            (Type::Bool, ColumnData::Bool(v)) => numeric::save_bools(v, buffer),
            (Type::String, ColumnData::String(v)) => string::save_strings(v, buffer),
            (Type::FixedString(width), ColumnData::String(v)) => {
                string::save_fixed_strings(v, *width, buffer)
            }
            (Type::Enum8(_) | Type::Enum16(_), ColumnData::String(v)) => {
                enum_column::save_names(v, column_type, buffer)?
            }
            (Type::Uuid, ColumnData::Uuid(v)) => uuid::save_uuids(v, buffer),
            (Type::Date, ColumnData::Date(v)) => date::save_dates(v, buffer),
            (Type::Date32, ColumnData::Date(v)) => date::save_date32s(v, buffer),
            (Type::DateTime(_), ColumnData::DateTime(v)) => date::save_datetimes(v, buffer),
            (Type::DateTime64(precision, _), ColumnData::DateTime(v)) => {
                date::save_datetime64s(v, *precision, buffer)
            }
            (Type::Nullable(inner), ColumnData::Nullable { mask, values }) => {
                nullable::save(mask, values, inner, buffer)?
            }
            (Type::Array(item), ColumnData::Array { offsets, values }) => {
                array::save(offsets, values, item, buffer)?
            }
            (
                Type::Map(key_type, value_type),
                ColumnData::Map {
                    offsets,
                    keys,
                    values,
                },
            ) => map::save(offsets, keys, values, key_type, value_type, buffer)?,
            _ => {
                return Err(Error::TypeMismatch {
                    expected: column_type.to_string(),
                    actual: self.variant_name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Deserialize `rows` values of `column_type` from the cursor.
    pub fn load_from_buffer(
        column_type: &Type,
        buffer: &mut &[u8],
        rows: usize,
    ) -> DecodeResult<ColumnData> {
        Ok(match column_type {
            Type::Float32 => ColumnData::Float32(numeric::load_vec(buffer, rows)?),
            Type::Float64 => ColumnData::Float64(numeric::load_vec(buffer, rows)?),
            Type::Int8 => ColumnData::Int8(numeric::load_vec(buffer, rows)?),
            Type::Int16 => ColumnData::Int16(numeric::load_vec(buffer, rows)?),
            Type::Int32 => ColumnData::Int32(numeric::load_vec(buffer, rows)?),
            Type::Int64 => ColumnData::Int64(numeric::load_vec(buffer, rows)?),
            Type::UInt8 => ColumnData::UInt8(numeric::load_vec(buffer, rows)?),
            Type::UInt16 => ColumnData::UInt16(numeric::load_vec(buffer, rows)?),
            Type::UInt32 => ColumnData::UInt32(numeric::load_vec(buffer, rows)?),
            Type::UInt64 => ColumnData::UInt64(numeric::load_vec(buffer, rows)?),
            Type::Bool => ColumnData::Bool(numeric::load_bools(buffer, rows)?),
            Type::String => ColumnData::String(string::load_strings(buffer, rows)?),
            Type::FixedString(width) => {
                ColumnData::String(string::load_fixed_strings(buffer, *width, rows)?)
            }
            Type::Enum8(_) | Type::Enum16(_) => {
                ColumnData::String(enum_column::load_names(buffer, column_type, rows)?)
            }
            Type::Uuid => ColumnData::Uuid(uuid::load_uuids(buffer, rows)?),
            Type::Date => ColumnData::Date(date::load_dates(buffer, rows)?),
            Type::Date32 => ColumnData::Date(date::load_date32s(buffer, rows)?),
            Type::DateTime(_) => ColumnData::DateTime(date::load_datetimes(buffer, rows)?),
            Type::DateTime64(precision, _) => {
                ColumnData::DateTime(date::load_datetime64s(buffer, *precision, rows)?)
            }
            Type::Nullable(inner) => {
                let (mask, values) = nullable::load(buffer, inner, rows)?;
                ColumnData::Nullable {
                    mask,
                    values: Box::new(values),
                }
            }
            Type::Array(item) => {
                let (offsets, values) = array::load(buffer, item, rows)?;
                ColumnData::Array {
                    offsets,
                    values: Box::new(values),
                }
            }
            Type::Map(key_type, value_type) => {
                let (offsets, keys, values) = map::load(buffer, key_type, value_type, rows)?;
                ColumnData::Map {
                    offsets,
                    keys: Box::new(keys),
                    values: Box::new(values),
                }
            }
        })
    }

    /// Null mask of a `Nullable` container (1 = null).
    pub fn null_mask(&self) -> Option<&[u8]> {
        match self {
            ColumnData::Nullable { mask, .. } => Some(mask),
            _ => None,
        }
    }

    /// Nested payload of a `Nullable` or `Array` container.
    pub fn nested(&self) -> Option<&ColumnData> {
        match self {
            ColumnData::Nullable { values, .. } => Some(values),
            ColumnData::Array { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Cumulative offsets of an `Array` or `Map` container.
    pub fn offsets(&self) -> Option<&[u64]> {
        match self {
            ColumnData::Array { offsets, .. } => Some(offsets),
            ColumnData::Map { offsets, .. } => Some(offsets),
            _ => None,
        }
    }
}

macro_rules! impl_scalar_conversions {
    ($type:ty, $variant:ident, $default:expr, $as_fn:ident, $as_opt_fn:ident) => {
        impl From<Vec<$type>> for ColumnData {
            fn from(values: Vec<$type>) -> Self {
                ColumnData::$variant(values)
            }
        }

        impl From<Vec<Option<$type>>> for ColumnData {
            fn from(items: Vec<Option<$type>>) -> Self {
                let mut mask = Vec::with_capacity(items.len());
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Some(value) => {
                            mask.push(0);
                            values.push(value);
                        }
                        None => {
                            mask.push(1);
                            values.push($default);
                        }
                    }
                }
                ColumnData::Nullable {
                    mask,
                    values: Box::new(ColumnData::$variant(values)),
                }
            }
        }

        impl ColumnData {
            /// Borrow the values when the container holds this scalar.
            pub fn $as_fn(&self) -> Option<&[$type]> {
                match self {
                    ColumnData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            /// Rebuild options from a nullable container of this scalar.
            pub fn $as_opt_fn(&self) -> Option<Vec<Option<$type>>> {
                match self {
                    ColumnData::Nullable { mask, values } => {
                        let inner = values.$as_fn()?;
                        Some(
                            mask.iter()
                                .zip(inner.iter())
                                .map(|(&null, value)| {
                                    (null == 0).then(|| value.clone())
                                })
                                .collect(),
                        )
                    }
                    _ => None,
                }
            }
        }
    };
}

impl_scalar_conversions!(f32, Float32, 0.0, as_f32s, as_opt_f32s);
impl_scalar_conversions!(f64, Float64, 0.0, as_f64s, as_opt_f64s);
impl_scalar_conversions!(i8, Int8, 0, as_i8s, as_opt_i8s);
impl_scalar_conversions!(i16, Int16, 0, as_i16s, as_opt_i16s);
impl_scalar_conversions!(i32, Int32, 0, as_i32s, as_opt_i32s);
impl_scalar_conversions!(i64, Int64, 0, as_i64s, as_opt_i64s);
impl_scalar_conversions!(u8, UInt8, 0, as_u8s, as_opt_u8s);
impl_scalar_conversions!(u16, UInt16, 0, as_u16s, as_opt_u16s);
impl_scalar_conversions!(u32, UInt32, 0, as_u32s, as_opt_u32s);
impl_scalar_conversions!(u64, UInt64, 0, as_u64s, as_opt_u64s);
impl_scalar_conversions!(bool, Bool, false, as_bools, as_opt_bools);
impl_scalar_conversions!(String, String, String::new(), as_strings, as_opt_strings);
impl_scalar_conversions!(::uuid::Uuid, Uuid, ::uuid::Uuid::nil(), as_uuids, as_opt_uuids);

impl From<Vec<&str>> for ColumnData {
    fn from(values: Vec<&str>) -> Self {
        ColumnData::String(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<Option<&str>>> for ColumnData {
    fn from(items: Vec<Option<&str>>) -> Self {
        ColumnData::from(
            items
                .into_iter()
                .map(|item| item.map(str::to_string))
                .collect::<Vec<Option<String>>>(),
        )
    }
}

impl From<Vec<NaiveDate>> for ColumnData {
    fn from(values: Vec<NaiveDate>) -> Self {
        ColumnData::Date(values)
    }
}

impl From<Vec<DateTime<Utc>>> for ColumnData {
    fn from(values: Vec<DateTime<Utc>>) -> Self {
        ColumnData::DateTime(values)
    }
}

macro_rules! impl_array_conversion {
    ($type:ty) => {
        impl From<Vec<Vec<$type>>> for ColumnData {
            fn from(rows: Vec<Vec<$type>>) -> Self {
                let mut offsets = Vec::with_capacity(rows.len());
                let mut flat = Vec::new();
                let mut total = 0u64;
                for row in rows {
                    total += row.len() as u64;
                    offsets.push(total);
                    flat.extend(row);
                }
                ColumnData::Array {
                    offsets,
                    values: Box::new(ColumnData::from(flat)),
                }
            }
        }
    };
}

impl_array_conversion!(i8);
impl_array_conversion!(i16);
impl_array_conversion!(i32);
impl_array_conversion!(i64);
impl_array_conversion!(u16);
impl_array_conversion!(u32);
impl_array_conversion!(u64);
impl_array_conversion!(f32);
impl_array_conversion!(f64);
impl_array_conversion!(String);

impl From<Vec<Vec<(String, String)>>> for ColumnData {
    fn from(rows: Vec<Vec<(String, String)>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len());
        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut total = 0u64;
        for row in rows {
            total += row.len() as u64;
            offsets.push(total);
            for (key, value) in row {
                keys.push(key);
                values.push(value);
            }
        }
        ColumnData::Map {
            offsets,
            keys: Box::new(ColumnData::String(keys)),
            values: Box::new(ColumnData::String(values)),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: Type,
    data: ColumnData,
}

impl Column {
    /// Build a column with a descriptor derived from the container shape.
    ///
    /// For inserts the provisional descriptor is replaced by the
    /// server-declared one once the target schema arrives.
    pub fn new(name: impl Into<String>, data: impl Into<ColumnData>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            column_type: data.derive_type(),
            data,
        }
    }

    /// Build a column with an explicit descriptor, validating the container
    /// against it.
    pub fn with_type(
        name: impl Into<String>,
        column_type: Type,
        data: impl Into<ColumnData>,
    ) -> Result<Self> {
        let data = data.into();
        if !data.matches(&column_type) {
            return Err(Error::TypeMismatch {
                expected: column_type.to_string(),
                actual: data.variant_name().to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            column_type,
            data,
        })
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type descriptor.
    pub fn column_type(&self) -> &Type {
        &self.column_type
    }

    /// Borrow the values container.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Consume the column, returning the values container.
    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replace the descriptor with the server-declared one, validating the
    /// container against it.
    pub(crate) fn attach_type(&mut self, column_type: Type) -> Result<()> {
        if !self.data.matches(&column_type) {
            return Err(Error::TypeMismatch {
                expected: column_type.to_string(),
                actual: self.data.variant_name().to_string(),
            });
        }
        self.column_type = column_type;
        Ok(())
    }

    /// Append another column's rows; descriptors must be identical.
    pub(crate) fn merge(&mut self, other: Column) -> Result<()> {
        if self.column_type != other.column_type {
            return Err(Error::TypeMismatch {
                expected: self.column_type.to_string(),
                actual: other.column_type.to_string(),
            });
        }
        self.data.merge(other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_variants() {
        assert_eq!(ColumnData::from(vec![1u32, 2, 3]).len(), 3);
        assert_eq!(ColumnData::from(vec!["a", "b"]).len(), 2);
        assert_eq!(
            ColumnData::from(vec![vec![1i32], vec![], vec![2, 3]]).len(),
            3
        );
    }

    #[test]
    fn test_nullable_construction() {
        let data = ColumnData::from(vec![Some(1u32), None, Some(3)]);
        assert_eq!(data.null_mask(), Some(&[0u8, 1, 0][..]));
        assert_eq!(data.nested().unwrap().as_u32s(), Some(&[1u32, 0, 3][..]));
        assert_eq!(
            data.as_opt_u32s().unwrap(),
            vec![Some(1), None, Some(3)]
        );
    }

    #[test]
    fn test_matches_string_family() {
        let data = ColumnData::from(vec!["hi"]);
        assert!(data.matches(&Type::String));
        assert!(data.matches(&Type::FixedString(7)));
        assert!(data.matches(&Type::Enum8(vec![("hi".to_string(), 1)])));
        assert!(!data.matches(&Type::UInt8));
    }

    #[test]
    fn test_matches_recursive() {
        let data = ColumnData::from(vec![Some(1u32), None]);
        assert!(data.matches(&Type::Nullable(Box::new(Type::UInt32))));
        assert!(!data.matches(&Type::Nullable(Box::new(Type::UInt64))));
        assert!(!data.matches(&Type::UInt32));
    }

    #[test]
    fn test_derive_type() {
        assert_eq!(ColumnData::from(vec![1i64]).derive_type(), Type::Int64);
        assert_eq!(
            ColumnData::from(vec![Some("x")]).derive_type().to_string(),
            "Nullable(String)"
        );
        assert_eq!(
            ColumnData::from(vec![vec![1i32]]).derive_type().to_string(),
            "Array(Int32)"
        );
    }

    #[test]
    fn test_merge_scalars() {
        let mut data = ColumnData::from(vec![1u32, 2]);
        data.merge(ColumnData::from(vec![3u32])).unwrap();
        assert_eq!(data.as_u32s(), Some(&[1u32, 2, 3][..]));
    }

    #[test]
    fn test_merge_arrays_rebases_offsets() {
        let mut data = ColumnData::from(vec![vec![1i32], vec![2, 3]]);
        data.merge(ColumnData::from(vec![vec![4i32, 5]])).unwrap();
        assert_eq!(data.offsets(), Some(&[1u64, 3, 5][..]));
        assert_eq!(data.nested().unwrap().as_i32s(), Some(&[1, 2, 3, 4, 5][..]));
    }

    #[test]
    fn test_merge_mismatch() {
        let mut data = ColumnData::from(vec![1u32]);
        let err = data.merge(ColumnData::from(vec![1i32])).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_save_rejects_mismatched_descriptor() {
        let data = ColumnData::from(vec![1u32]);
        let mut buf = BytesMut::new();
        assert!(data.save_to_buffer(&Type::String, &mut buf).is_err());
    }

    #[test]
    fn test_roundtrip_via_descriptor() {
        let descriptor = Type::parse("Nullable(String)").unwrap();
        let data = ColumnData::from(vec![None, Some("hello"), None]);

        let mut buf = BytesMut::new();
        data.save_to_buffer(&descriptor, &mut buf).unwrap();

        let mut cursor = &buf[..];
        let decoded = ColumnData::load_from_buffer(&descriptor, &mut cursor, 3).unwrap();
        assert_eq!(decoded, data);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_nullable_array_roundtrip() {
        let descriptor = Type::parse("Nullable(Array(String))").unwrap();
        let data = ColumnData::Nullable {
            mask: vec![0, 1, 0],
            values: Box::new(ColumnData::from(vec![
                vec!["a".to_string(), "b".to_string()],
                vec![],
                vec!["c".to_string()],
            ])),
        };
        assert!(data.matches(&descriptor));

        let mut buf = BytesMut::new();
        data.save_to_buffer(&descriptor, &mut buf).unwrap();

        let mut cursor = &buf[..];
        let decoded = ColumnData::load_from_buffer(&descriptor, &mut cursor, 3).unwrap();
        assert_eq!(decoded, data);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_column_attach_type() {
        let mut column = Column::new("s", vec!["abc", "de"]);
        assert_eq!(column.column_type(), &Type::String);

        column.attach_type(Type::FixedString(7)).unwrap();
        assert_eq!(column.column_type(), &Type::FixedString(7));

        assert!(column.attach_type(Type::UInt8).is_err());
    }

    #[test]
    fn test_column_merge_requires_same_descriptor() {
        let mut a = Column::with_type("x", Type::Date32, ColumnData::Date(vec![])).unwrap();
        let b = Column::new("x", ColumnData::Date(vec![]));
        // b derives plain Date; merging into Date32 is a type error.
        assert!(a.merge(b).is_err());
    }
}
