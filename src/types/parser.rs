//! Recursive descent parser for the server's textual type form.
//!
//! Composite types are recognized by prefix, longest match first, and the
//! parser recurses on the expression inside the outermost parentheses.

use super::Type;
use crate::{Error, Result};

/// Parse a type name such as `Array(Enum8('hi' = -1, 'bye' = 5))`.
pub fn parse_type_name(name: &str) -> Result<Type> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::TypeParse("empty type name".to_string()));
    }

    if let Some(inner) = strip_composite(name, "Nullable(")? {
        let nested = parse_type_name(inner)?;
        return Type::nullable(nested);
    }
    if let Some(inner) = strip_composite(name, "Array(")? {
        let item = parse_type_name(inner)?;
        return Type::array(item);
    }
    if let Some(inner) = strip_composite(name, "Map(")? {
        let (key, value) = split_top_level(inner).ok_or_else(|| {
            Error::TypeParse(format!("Map needs two arguments: {}", name))
        })?;
        let key = parse_type_name(key)?;
        let value = parse_type_name(value)?;
        if key != Type::String || value != Type::String {
            return Err(Error::TypeParse(format!(
                "Only Map(String, String) is supported, got: {}",
                name
            )));
        }
        return Ok(Type::map_string_string());
    }
    if let Some(inner) = strip_composite(name, "FixedString(")? {
        let len: usize = inner.trim().parse().map_err(|_| {
            Error::TypeParse(format!("Bad FixedString length: {}", name))
        })?;
        if len == 0 {
            return Err(Error::TypeParse(
                "FixedString length must be positive".to_string(),
            ));
        }
        return Ok(Type::FixedString(len));
    }
    // DateTime64( must be tried before DateTime( -- longest prefix wins.
    if let Some(inner) = strip_composite(name, "DateTime64(")? {
        let (precision, timezone) = match split_top_level(inner) {
            Some((p, tz)) => (p, Some(parse_quoted(tz)?)),
            None => (inner, None),
        };
        let precision: u32 = precision.trim().parse().map_err(|_| {
            Error::TypeParse(format!("Bad DateTime64 precision: {}", name))
        })?;
        if precision > 9 {
            return Err(Error::TypeParse(format!(
                "DateTime64 precision out of range: {}",
                precision
            )));
        }
        return Ok(Type::DateTime64(precision, timezone));
    }
    if let Some(inner) = strip_composite(name, "DateTime(")? {
        return Ok(Type::DateTime(Some(parse_quoted(inner)?)));
    }
    if let Some(inner) = strip_composite(name, "Enum8(")? {
        let items = parse_enum_items(inner)?;
        let items = items
            .into_iter()
            .map(|(n, v)| {
                i8::try_from(v).map(|v| (n, v)).map_err(|_| {
                    Error::TypeParse(format!("Enum8 value out of range: {}", v))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Type::Enum8(items));
    }
    if let Some(inner) = strip_composite(name, "Enum16(")? {
        let items = parse_enum_items(inner)?;
        return Ok(Type::Enum16(items));
    }

    match name {
        "Float32" => Ok(Type::Float32),
        "Float64" => Ok(Type::Float64),
        "Int8" => Ok(Type::Int8),
        "Int16" => Ok(Type::Int16),
        "Int32" => Ok(Type::Int32),
        "Int64" => Ok(Type::Int64),
        "UInt8" => Ok(Type::UInt8),
        "UInt16" => Ok(Type::UInt16),
        "UInt32" => Ok(Type::UInt32),
        "UInt64" => Ok(Type::UInt64),
        "UUID" => Ok(Type::Uuid),
        "String" => Ok(Type::String),
        "Bool" => Ok(Type::Bool),
        "Date" => Ok(Type::Date),
        "Date32" => Ok(Type::Date32),
        "DateTime" => Ok(Type::DateTime(None)),
        _ => Err(Error::TypeParse(format!("Unknown type: {}", name))),
    }
}

/// If `name` starts with `prefix` and ends with a matching `)`, return the
/// expression between the outermost parentheses.
fn strip_composite<'a>(name: &'a str, prefix: &str) -> Result<Option<&'a str>> {
    if !name.starts_with(prefix) {
        return Ok(None);
    }
    if !name.ends_with(')') {
        return Err(Error::TypeParse(format!(
            "Unbalanced parentheses in type: {}",
            name
        )));
    }
    Ok(Some(&name[prefix.len()..name.len() - 1]))
}

/// Split `s` at the first comma that sits outside parentheses and quotes.
fn split_top_level(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                return Some((&s[..i], s[i + 1..].trim_start()));
            }
            _ => {}
        }
    }
    None
}

/// Strip single quotes from `'value'`.
fn parse_quoted(s: &str) -> Result<String> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        Ok(s[1..s.len() - 1].to_string())
    } else {
        Err(Error::TypeParse(format!("Expected quoted string: {}", s)))
    }
}

/// Parse `'name' = N, 'name' = N, ...` into an ordered map.
fn parse_enum_items(s: &str) -> Result<Vec<(String, i16)>> {
    let mut items = Vec::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
        let (item, tail) = match split_top_level(rest) {
            Some((item, tail)) => (item, tail),
            None => (rest, ""),
        };

        let (name, value) = item.split_once('=').ok_or_else(|| {
            Error::TypeParse(format!("Bad enum item: {}", item))
        })?;
        let name = parse_quoted(name)?;
        let value: i16 = value.trim().parse().map_err(|_| {
            Error::TypeParse(format!("Bad enum value: {}", item))
        })?;

        items.push((name, value));
        rest = tail;
    }

    if items.is_empty() {
        return Err(Error::TypeParse("Enum with no items".to_string()));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_types() {
        assert_eq!(parse_type_name("Int32").unwrap(), Type::Int32);
        assert_eq!(parse_type_name("String").unwrap(), Type::String);
        assert_eq!(parse_type_name("UUID").unwrap(), Type::Uuid);
        assert_eq!(parse_type_name("Bool").unwrap(), Type::Bool);
        assert_eq!(parse_type_name("Date32").unwrap(), Type::Date32);
        assert!(parse_type_name("Whatever").is_err());
    }

    #[test]
    fn test_fixed_string() {
        assert_eq!(parse_type_name("FixedString(7)").unwrap(), Type::FixedString(7));
        assert!(parse_type_name("FixedString(x)").is_err());
        assert!(parse_type_name("FixedString(0)").is_err());
    }

    #[test]
    fn test_datetime_family() {
        assert_eq!(parse_type_name("DateTime").unwrap(), Type::DateTime(None));
        assert_eq!(
            parse_type_name("DateTime('Europe/Moscow')").unwrap(),
            Type::DateTime(Some("Europe/Moscow".to_string()))
        );
        assert_eq!(
            parse_type_name("DateTime64(3)").unwrap(),
            Type::DateTime64(3, None)
        );
        assert_eq!(
            parse_type_name("DateTime64(3, 'GMT')").unwrap(),
            Type::DateTime64(3, Some("GMT".to_string()))
        );
        assert!(parse_type_name("DateTime64(12)").is_err());
    }

    #[test]
    fn test_enum_types() {
        assert_eq!(
            parse_type_name("Enum8('hi' = -1, 'bye' = 5)").unwrap(),
            Type::Enum8(vec![("hi".to_string(), -1), ("bye".to_string(), 5)])
        );
        assert_eq!(
            parse_type_name("Enum16('a' = 300)").unwrap(),
            Type::Enum16(vec![("a".to_string(), 300)])
        );
        // Commas and parens inside names must not confuse the splitter.
        assert_eq!(
            parse_type_name("Enum8('a,b' = 1, '(c)' = 2)").unwrap(),
            Type::Enum8(vec![("a,b".to_string(), 1), ("(c)".to_string(), 2)])
        );
        assert!(parse_type_name("Enum8('big' = 200)").is_err());
        assert!(parse_type_name("Enum8()").is_err());
    }

    #[test]
    fn test_nesting_rules() {
        assert_eq!(
            parse_type_name("Nullable(UInt32)").unwrap(),
            Type::Nullable(Box::new(Type::UInt32))
        );
        // Nullable(Array(..)) is accepted, Array(Nullable(..)) is not.
        assert!(parse_type_name("Nullable(Array(Int32))").is_ok());
        assert!(parse_type_name("Array(Nullable(Int32))").is_err());
        assert!(parse_type_name("Nullable(Nullable(Int8))").is_err());
    }

    #[test]
    fn test_array_of_enum() {
        let t = parse_type_name("Array(Enum8('hi' = -1, 'bye' = 5))").unwrap();
        assert_eq!(t.to_string(), "Array(Enum8('hi' = -1, 'bye' = 5))");
    }

    #[test]
    fn test_map() {
        assert_eq!(
            parse_type_name("Map(String, String)").unwrap(),
            Type::map_string_string()
        );
        assert!(parse_type_name("Map(String, UInt8)").is_err());
        assert!(parse_type_name("Map(String)").is_err());
    }

    #[test]
    fn test_roundtrip_through_display() {
        for name in [
            "UInt64",
            "FixedString(16)",
            "Nullable(UInt32)",
            "Nullable(Array(String))",
            "Array(Enum8('hi' = -1, 'bye' = 5))",
            "Map(String, String)",
            "DateTime64(3, 'GMT')",
            "DateTime('UTC')",
        ] {
            let parsed = parse_type_name(name).unwrap();
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn test_unbalanced() {
        assert!(parse_type_name("Array(Int32").is_err());
        assert!(parse_type_name("Nullable(").is_err());
    }
}
