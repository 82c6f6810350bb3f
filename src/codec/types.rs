//! Field data types and typed field values

use crate::codec::error::{FieldError, FieldResult};
use crate::codec::parse::parse_str;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared type of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldDataType {
    Text,
    DateTime,
    Double,
    Integer,
    Long,
    Boolean,
    Uuid,
    Binary,
    Timepoint,
}

impl FieldDataType {
    /// Number of data types
    pub const COUNT: usize = 9;

    /// All data types, in declaration order
    pub fn all() -> &'static [FieldDataType] {
        &[
            FieldDataType::Text,
            FieldDataType::DateTime,
            FieldDataType::Double,
            FieldDataType::Integer,
            FieldDataType::Long,
            FieldDataType::Boolean,
            FieldDataType::Uuid,
            FieldDataType::Binary,
            FieldDataType::Timepoint,
        ]
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldDataType::Text => "TEXT",
            FieldDataType::DateTime => "DATE_TIME",
            FieldDataType::Double => "DOUBLE",
            FieldDataType::Integer => "INTEGER",
            FieldDataType::Long => "LONG",
            FieldDataType::Boolean => "BOOLEAN",
            FieldDataType::Uuid => "UUID",
            FieldDataType::Binary => "BINARY",
            FieldDataType::Timepoint => "TIMEPOINT",
        }
    }

    /// Types whose raw representation is already a string
    pub fn is_string_like(&self) -> bool {
        matches!(self, FieldDataType::Text | FieldDataType::Binary)
    }

    /// Position in `all()`, used for fixed-size per-type tables
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "TEXT" => Ok(FieldDataType::Text),
            "DATE_TIME" | "DATETIME" => Ok(FieldDataType::DateTime),
            "DOUBLE" => Ok(FieldDataType::Double),
            "INTEGER" => Ok(FieldDataType::Integer),
            "LONG" => Ok(FieldDataType::Long),
            "BOOLEAN" => Ok(FieldDataType::Boolean),
            "UUID" => Ok(FieldDataType::Uuid),
            "BINARY" => Ok(FieldDataType::Binary),
            "TIMEPOINT" => Ok(FieldDataType::Timepoint),
            _ => Err(format!("unknown field data type: {}", s)),
        }
    }
}

/// A field value coerced to its declared data type
///
/// One variant per `FieldDataType`; `Binary` keeps its base64 source text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    DateTime(DateTime<Utc>),
    Double(f64),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Uuid(Uuid),
    Binary(String),
    Timepoint(DateTime<Utc>),
}

impl FieldValue {
    /// Data type this value was coerced to
    pub fn data_type(&self) -> FieldDataType {
        match self {
            FieldValue::Text(_) => FieldDataType::Text,
            FieldValue::DateTime(_) => FieldDataType::DateTime,
            FieldValue::Double(_) => FieldDataType::Double,
            FieldValue::Integer(_) => FieldDataType::Integer,
            FieldValue::Long(_) => FieldDataType::Long,
            FieldValue::Boolean(_) => FieldDataType::Boolean,
            FieldValue::Uuid(_) => FieldDataType::Uuid,
            FieldValue::Binary(_) => FieldDataType::Binary,
            FieldValue::Timepoint(_) => FieldDataType::Timepoint,
        }
    }

    /// Coerce a raw JSON value to `data_type`
    ///
    /// Raw strings for non string-like types go through `parse_str`;
    /// otherwise the JSON value must already have the matching shape.
    pub fn coerce(raw: &Value, data_type: FieldDataType) -> FieldResult<FieldValue> {
        if let Value::String(s) = raw {
            return parse_str(s, data_type);
        }

        let mismatch = || FieldError::TypeMismatch {
            expected: data_type,
            found: json_kind(raw),
            raw: raw.to_string(),
        };

        match data_type {
            FieldDataType::Text | FieldDataType::Binary | FieldDataType::Uuid => Err(mismatch()),
            FieldDataType::Integer => raw
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(FieldValue::Integer)
                .ok_or_else(mismatch),
            FieldDataType::Long => raw.as_i64().map(FieldValue::Long).ok_or_else(mismatch),
            FieldDataType::Double => raw.as_f64().map(FieldValue::Double).ok_or_else(mismatch),
            FieldDataType::Boolean => raw.as_bool().map(FieldValue::Boolean).ok_or_else(mismatch),
            FieldDataType::DateTime => raw
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(FieldValue::DateTime)
                .ok_or_else(mismatch),
            FieldDataType::Timepoint => raw
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(FieldValue::Timepoint)
                .ok_or_else(mismatch),
        }
    }

    /// JSON rendering, used for index row columns and lookups
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) | FieldValue::Binary(s) => Value::String(s.clone()),
            FieldValue::DateTime(dt) | FieldValue::Timepoint(dt) => {
                Value::from(dt.timestamp_millis())
            }
            FieldValue::Double(v) => Value::from(*v),
            FieldValue::Integer(v) => Value::from(*v),
            FieldValue::Long(v) => Value::from(*v),
            FieldValue::Boolean(v) => Value::Bool(*v),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_names() {
        for dt in FieldDataType::all() {
            assert_eq!(dt.as_str().parse::<FieldDataType>().unwrap(), *dt);
        }
        assert_eq!("date-time".parse::<FieldDataType>().unwrap(), FieldDataType::DateTime);
        assert!("varchar".parse::<FieldDataType>().is_err());

        let json = serde_json::to_string(&FieldDataType::DateTime).unwrap();
        assert_eq!(json, "\"DATE_TIME\"");
    }

    #[test]
    fn test_ordinals_match_all() {
        for (i, dt) in FieldDataType::all().iter().enumerate() {
            assert_eq!(dt.ordinal(), i);
        }
        assert_eq!(FieldDataType::all().len(), FieldDataType::COUNT);
    }

    #[test]
    fn test_coerce_typed_values() {
        assert_eq!(
            FieldValue::coerce(&json!(42), FieldDataType::Integer).unwrap(),
            FieldValue::Integer(42)
        );
        assert_eq!(
            FieldValue::coerce(&json!(1.5), FieldDataType::Double).unwrap(),
            FieldValue::Double(1.5)
        );
        assert_eq!(
            FieldValue::coerce(&json!(true), FieldDataType::Boolean).unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            FieldValue::coerce(&json!("hi"), FieldDataType::Text).unwrap(),
            FieldValue::Text("hi".to_string())
        );

        let dt = FieldValue::coerce(&json!(1_000), FieldDataType::DateTime).unwrap();
        assert_eq!(dt.to_json(), json!(1_000));
    }

    #[test]
    fn test_coerce_raw_strings() {
        assert_eq!(
            FieldValue::coerce(&json!("17"), FieldDataType::Long).unwrap(),
            FieldValue::Long(17)
        );

        let err = FieldValue::coerce(&json!("seventeen"), FieldDataType::Long).unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.raw_value(), Some("seventeen"));
    }

    #[test]
    fn test_coerce_type_mismatch() {
        let err = FieldValue::coerce(&json!(12), FieldDataType::Text).unwrap_err();
        assert!(matches!(
            err,
            FieldError::TypeMismatch {
                expected: FieldDataType::Text,
                found: "number",
                ..
            }
        ));

        // Out of i32 range
        let err = FieldValue::coerce(&json!(1_i64 << 40), FieldDataType::Integer).unwrap_err();
        assert!(!err.is_parse());

        let err = FieldValue::coerce(&json!([1, 2]), FieldDataType::Double).unwrap_err();
        assert!(err.to_string().contains("array"));
    }
}
