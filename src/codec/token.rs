//! Bucketing tokens
//!
//! Each data type maps onto a signed 64-bit token. The encodings are
//! fixed-width and order preserving so that sorted bucket boundaries can be
//! binary-searched with them.

use crate::codec::error::{FieldError, FieldResult};
use crate::codec::types::{FieldDataType, FieldValue};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 2000-01-01T00:00:00Z in epoch milliseconds (TIMEPOINT anchor)
pub const TIMEPOINT_EPOCH_MS: i64 = 946_684_800_000;

/// 2030-01-01T00:00:00Z as an offset from the TIMEPOINT anchor
pub const TIMEPOINT_HORIZON_MS: i64 = 946_771_200_000;

/// Minimum base64 characters for a BINARY value
const MIN_BINARY_CHARS: usize = 4;

/// Number of leading bytes folded into a token
const TOKEN_BYTES: usize = 8;

/// Compute the bucketing token of a typed value
pub fn token_for(value: &FieldValue) -> FieldResult<i64> {
    match value {
        FieldValue::Boolean(b) => Ok(i64::from(*b)),
        FieldValue::Integer(v) => Ok(integer_token(*v)),
        FieldValue::Long(v) => Ok(*v),
        FieldValue::Double(v) => Ok(double_token(*v)),
        FieldValue::DateTime(dt) => Ok(dt.timestamp_millis()),
        FieldValue::Timepoint(dt) => Ok(timepoint_token(dt)),
        FieldValue::Uuid(u) => Ok(uuid_token(u)),
        FieldValue::Binary(s) => binary_token(s),
        FieldValue::Text(s) => text_token(s),
    }
}

fn integer_token(v: i32) -> i64 {
    if v == i32::MIN {
        i64::from(v + 1)
    } else {
        i64::from(v)
    }
}

/// Round to nearest; `as` saturates at the i64 bounds and maps NaN to 0
fn double_token(v: f64) -> i64 {
    v.round() as i64
}

fn timepoint_token(dt: &DateTime<Utc>) -> i64 {
    let offset = dt.timestamp_millis().saturating_sub(TIMEPOINT_EPOCH_MS);
    offset.clamp(0, TIMEPOINT_HORIZON_MS)
}

fn uuid_token(u: &Uuid) -> i64 {
    let bytes = u.as_bytes();

    if u.get_version_num() == 1 {
        // time_hi (12 bits) | time_mid (16 bits) | time_low (32 bits)
        let time_low = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64;
        let time_mid = u16::from_be_bytes([bytes[4], bytes[5]]) as i64;
        let time_hi = (u16::from_be_bytes([bytes[6], bytes[7]]) & 0x0FFF) as i64;
        return (time_hi << 48) | (time_mid << 32) | time_low;
    }

    (u.as_u128() >> 64) as u64 as i64
}

fn binary_token(s: &str) -> FieldResult<i64> {
    if s.len() < MIN_BINARY_CHARS {
        return Err(FieldError::parse(
            s,
            FieldDataType::Binary,
            format!("expected at least {} base64 characters", MIN_BINARY_CHARS),
        ));
    }

    if !is_base64(s) {
        return Err(FieldError::parse(s, FieldDataType::Binary, "invalid base64"));
    }

    Ok(padded_be_i64(s.as_bytes()))
}

fn text_token(s: &str) -> FieldResult<i64> {
    if s.is_empty() {
        return Err(FieldError::Empty(FieldDataType::Text));
    }

    Ok(padded_be_i64(s.as_bytes()).saturating_abs())
}

/// First 8 bytes as big-endian i64, zero padded on the right
fn padded_be_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; TOKEN_BYTES];
    let n = bytes.len().min(TOKEN_BYTES);
    buf[..n].copy_from_slice(&bytes[..n]);
    i64::from_be_bytes(buf)
}

/// Standard (`+/`) or URL-safe (`-_`) alphabet, never both in one value,
/// with at most two trailing '=' pads
fn is_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    if s.len() - body.len() > 2 {
        return false;
    }

    let standard = body.bytes().any(|c| c == b'+' || c == b'/');
    let url_safe = body.bytes().any(|c| c == b'-' || c == b'_');
    if standard && url_safe {
        return false;
    }

    body.bytes()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'+' | b'/' | b'-' | b'_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(value: FieldValue) -> i64 {
        token_for(&value).unwrap()
    }

    #[test]
    fn test_boolean_and_integer() {
        assert_eq!(token(FieldValue::Boolean(false)), 0);
        assert_eq!(token(FieldValue::Boolean(true)), 1);

        assert_eq!(token(FieldValue::Integer(-5)), -5);
        assert_eq!(token(FieldValue::Integer(i32::MAX)), i32::MAX as i64);
        assert_eq!(token(FieldValue::Integer(i32::MIN)), i32::MIN as i64 + 1);
    }

    #[test]
    fn test_double_rounding_and_clamp() {
        assert_eq!(token(FieldValue::Double(2.4)), 2);
        assert_eq!(token(FieldValue::Double(2.5)), 3);
        assert_eq!(token(FieldValue::Double(-2.5)), -3);
        assert_eq!(token(FieldValue::Double(1e300)), i64::MAX);
        assert_eq!(token(FieldValue::Double(-1e300)), i64::MIN);
        assert_eq!(token(FieldValue::Double(f64::NAN)), 0);
    }

    #[test]
    fn test_datetime_is_epoch_millis() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(token(FieldValue::DateTime(dt)), 1_709_294_400_000);

        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(token(FieldValue::DateTime(before_epoch)), -1_000);
    }

    #[test]
    fn test_timepoint_clamps_to_window() {
        let anchor = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(anchor.timestamp_millis(), TIMEPOINT_EPOCH_MS);
        assert_eq!(token(FieldValue::Timepoint(anchor)), 0);

        let early = Utc.with_ymd_and_hms(1990, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(token(FieldValue::Timepoint(early)), 0);

        let horizon = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(token(FieldValue::Timepoint(horizon)), TIMEPOINT_HORIZON_MS);

        let late = Utc.with_ymd_and_hms(2045, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(token(FieldValue::Timepoint(late)), TIMEPOINT_HORIZON_MS);

        let inside = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(token(FieldValue::Timepoint(inside)), 1_000);
    }

    #[test]
    fn test_uuid_v1_uses_timestamp() {
        // time_low=0x00000001, time_mid=0x0002, version 1 with time_hi=0x003
        let u = Uuid::parse_str("00000001-0002-1003-8000-000000000000").unwrap();
        assert_eq!(u.get_version_num(), 1);
        assert_eq!(token(FieldValue::Uuid(u)), (0x003 << 48) | (0x0002 << 32) | 0x1);
    }

    #[test]
    fn test_uuid_v4_uses_high_bits() {
        let u = Uuid::parse_str("12345678-9abc-4def-8000-000000000000").unwrap();
        assert_eq!(token(FieldValue::Uuid(u)), 0x1234_5678_9abc_4def);
    }

    #[test]
    fn test_binary_minimum_length() {
        assert!(token_for(&FieldValue::Binary("QUJD".to_string())).is_ok());

        let err = token_for(&FieldValue::Binary("QUJ".to_string())).unwrap_err();
        assert!(err.is_parse());

        let err = token_for(&FieldValue::Binary("QU!D".to_string())).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_binary_alphabet_is_not_mixed() {
        assert!(token_for(&FieldValue::Binary("ab+/cd==".to_string())).is_ok());
        assert!(token_for(&FieldValue::Binary("ab-_cd==".to_string())).is_ok());

        let err = token_for(&FieldValue::Binary("ab+_cd==".to_string())).unwrap_err();
        assert!(err.is_parse());
        let err = token_for(&FieldValue::Binary("ab-/cd".to_string())).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_binary_uses_first_eight_source_chars() {
        let expected = i64::from_be_bytes(*b"QUJDREVG");
        assert_eq!(token(FieldValue::Binary("QUJDREVGR0g=".to_string())), expected);

        let expected = i64::from_be_bytes([b'Q', b'U', b'J', b'D', 0, 0, 0, 0]);
        assert_eq!(token(FieldValue::Binary("QUJD".to_string())), expected);
    }

    #[test]
    fn test_text_byte_expectations() {
        assert_eq!(token(FieldValue::Text("hello".to_string())), 0x6865_6c6c_6f00_0000);
        assert_eq!(token(FieldValue::Text("zzzz".to_string())), 0x7a7a_7a7a_0000_0000);
        assert_eq!(token(FieldValue::Text("a".to_string())), 0x6100_0000_0000_0000);

        // Only the first 8 bytes count
        assert_eq!(
            token(FieldValue::Text("abcdefgh-suffix".to_string())),
            token(FieldValue::Text("abcdefgh".to_string()))
        );

        let hello = token(FieldValue::Text("hello".to_string()));
        let zzzz = token(FieldValue::Text("zzzz".to_string()));
        assert!(hello >= 0 && zzzz >= 0);
        assert!(hello < zzzz);
    }

    #[test]
    fn test_text_empty_is_no_value() {
        let err = token_for(&FieldValue::Text(String::new())).unwrap_err();
        assert_eq!(err, FieldError::Empty(FieldDataType::Text));
    }

    #[test]
    fn test_text_high_bit_is_absolute() {
        // 0xC3 0xA9 = "é": negative as a signed prefix, flipped by abs()
        let t = token(FieldValue::Text("é".to_string()));
        assert!(t > 0);
        assert_eq!(t, (i64::from_be_bytes([0xC3, 0xA9, 0, 0, 0, 0, 0, 0])).abs());
    }

    #[test]
    fn test_monotonic_per_type() {
        let longs = [i64::MIN, -10, 0, 7, i64::MAX];
        for w in longs.windows(2) {
            assert!(token(FieldValue::Long(w[0])) < token(FieldValue::Long(w[1])));
        }

        let ints = [i32::MIN + 1, -1, 0, 1, i32::MAX];
        for w in ints.windows(2) {
            assert!(token(FieldValue::Integer(w[0])) < token(FieldValue::Integer(w[1])));
        }

        let doubles = [-1e12, -3.0, 0.0, 4.0, 1e12];
        for w in doubles.windows(2) {
            assert!(token(FieldValue::Double(w[0])) < token(FieldValue::Double(w[1])));
        }

        let texts = ["apple", "banana", "cherry", "zebra"];
        for w in texts.windows(2) {
            assert!(
                token(FieldValue::Text(w[0].to_string()))
                    < token(FieldValue::Text(w[1].to_string()))
            );
        }

        let t1 = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(token(FieldValue::Timepoint(t1)) < token(FieldValue::Timepoint(t2)));
        assert!(token(FieldValue::DateTime(t1)) < token(FieldValue::DateTime(t2)));
    }
}
