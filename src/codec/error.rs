//! Field codec error types

use crate::codec::FieldDataType;
use thiserror::Error;

/// Errors raised while coercing or tokenizing a field value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// A raw string could not be parsed into the target type
    #[error("cannot parse '{raw}' as {data_type}: {reason}")]
    Parse {
        raw: String,
        data_type: FieldDataType,
        reason: String,
    },

    /// The JSON value has the wrong shape for the target type
    #[error("expected {expected}, found {found} value {raw}")]
    TypeMismatch {
        expected: FieldDataType,
        found: &'static str,
        raw: String,
    },

    /// The value carries no bucketable content (empty text)
    #[error("empty {0} value")]
    Empty(FieldDataType),
}

impl FieldError {
    pub(crate) fn parse(raw: &str, data_type: FieldDataType, reason: impl ToString) -> Self {
        FieldError::Parse {
            raw: raw.to_string(),
            data_type,
            reason: reason.to_string(),
        }
    }

    /// True for string parse failures (as opposed to shape mismatches)
    pub fn is_parse(&self) -> bool {
        matches!(self, FieldError::Parse { .. })
    }

    /// True when the value should be treated as absent
    pub fn is_empty_value(&self) -> bool {
        matches!(self, FieldError::Empty(_))
    }

    /// The offending raw value, when there is one
    pub fn raw_value(&self) -> Option<&str> {
        match self {
            FieldError::Parse { raw, .. } | FieldError::TypeMismatch { raw, .. } => Some(raw),
            FieldError::Empty(_) => None,
        }
    }
}

/// Result type alias for codec operations
pub type FieldResult<T> = Result<T, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldError::parse("abc", FieldDataType::Integer, "invalid digit");
        assert_eq!(err.to_string(), "cannot parse 'abc' as INTEGER: invalid digit");
        assert!(err.is_parse());
        assert_eq!(err.raw_value(), Some("abc"));

        let err = FieldError::Empty(FieldDataType::Text);
        assert_eq!(err.to_string(), "empty TEXT value");
        assert!(err.is_empty_value());
        assert!(err.raw_value().is_none());
    }
}
