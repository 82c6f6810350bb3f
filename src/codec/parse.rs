//! String parsers for raw field input
//!
//! Used when a value arrives as a JSON string but the declared type is not
//! string-like (e.g. `"42"` for an INTEGER field).

use crate::codec::error::{FieldError, FieldResult};
use crate::codec::types::{FieldDataType, FieldValue};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Parse a raw string into a value of `data_type`
pub fn parse_str(raw: &str, data_type: FieldDataType) -> FieldResult<FieldValue> {
    let trimmed = raw.trim();

    match data_type {
        FieldDataType::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldDataType::Binary => Ok(FieldValue::Binary(raw.to_string())),
        FieldDataType::Integer => trimmed
            .parse::<i32>()
            .map(FieldValue::Integer)
            .map_err(|e| FieldError::parse(raw, data_type, e)),
        FieldDataType::Long => trimmed
            .parse::<i64>()
            .map(FieldValue::Long)
            .map_err(|e| FieldError::parse(raw, data_type, e)),
        FieldDataType::Double => trimmed
            .parse::<f64>()
            .map(FieldValue::Double)
            .map_err(|e| FieldError::parse(raw, data_type, e)),
        FieldDataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(FieldValue::Boolean(true)),
            "false" => Ok(FieldValue::Boolean(false)),
            _ => Err(FieldError::parse(raw, data_type, "expected true or false")),
        },
        FieldDataType::Uuid => Uuid::parse_str(trimmed)
            .map(FieldValue::Uuid)
            .map_err(|e| FieldError::parse(raw, data_type, e)),
        FieldDataType::DateTime => parse_datetime(raw, data_type).map(FieldValue::DateTime),
        FieldDataType::Timepoint => parse_datetime(raw, data_type).map(FieldValue::Timepoint),
    }
}

/// Parse an RFC 3339 timestamp or a bare epoch-milliseconds integer
pub fn parse_datetime(raw: &str, data_type: FieldDataType) -> FieldResult<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ms) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| FieldError::parse(raw, data_type, "timestamp out of range"));
    }

    Err(FieldError::parse(
        raw,
        data_type,
        "expected RFC 3339 or epoch milliseconds",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(
            parse_str(" 12 ", FieldDataType::Integer).unwrap(),
            FieldValue::Integer(12)
        );
        assert_eq!(
            parse_str("-9000000000", FieldDataType::Long).unwrap(),
            FieldValue::Long(-9_000_000_000)
        );
        assert_eq!(
            parse_str("2.5", FieldDataType::Double).unwrap(),
            FieldValue::Double(2.5)
        );

        assert!(parse_str("9000000000", FieldDataType::Integer).is_err());
        assert!(parse_str("2.5", FieldDataType::Long).is_err());
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(
            parse_str("TRUE", FieldDataType::Boolean).unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            parse_str("false", FieldDataType::Boolean).unwrap(),
            FieldValue::Boolean(false)
        );

        let err = parse_str("yes", FieldDataType::Boolean).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_parse_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_str(&id.to_string(), FieldDataType::Uuid).unwrap(),
            FieldValue::Uuid(id)
        );
        assert!(parse_str("not-a-uuid", FieldDataType::Uuid).is_err());
    }

    #[test]
    fn test_parse_datetime_formats() {
        let dt = parse_datetime("2024-03-01T12:00:00Z", FieldDataType::DateTime).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_709_294_400_000);

        let dt = parse_datetime("2024-03-01T13:00:00+01:00", FieldDataType::DateTime).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_709_294_400_000);

        let dt = parse_datetime("1709294400000", FieldDataType::Timepoint).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_709_294_400_000);

        let err = parse_datetime("yesterday", FieldDataType::DateTime).unwrap_err();
        assert_eq!(err.raw_value(), Some("yesterday"));
    }

    #[test]
    fn test_string_like_types_kept_verbatim() {
        assert_eq!(
            parse_str(" padded ", FieldDataType::Text).unwrap(),
            FieldValue::Text(" padded ".to_string())
        );
        assert_eq!(
            parse_str("AAAA", FieldDataType::Binary).unwrap(),
            FieldValue::Binary("AAAA".to_string())
        );
    }
}
