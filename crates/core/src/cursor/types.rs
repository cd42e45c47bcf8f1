use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CursorError;

/// Comparison strategy carried by a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorType {
    /// Numeric offset; continuation is the caller's skip/limit.
    Offset,
    /// Millisecond timestamp of the last row.
    Timestamp,
    /// Identifier of the last row.
    Id,
}

impl fmt::Display for CursorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CursorType::Offset => "offset",
            CursorType::Timestamp => "timestamp",
            CursorType::Id => "id",
        };
        f.write_str(name)
    }
}

impl FromStr for CursorType {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offset" => Ok(CursorType::Offset),
            "timestamp" => Ok(CursorType::Timestamp),
            "id" => Ok(CursorType::Id),
            _ => Err(CursorError::UnknownType(s.to_string())),
        }
    }
}

/// Direction of the ordered page the cursor continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn is_descending(self) -> bool {
        self == SortOrder::Descending
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortOrder::Ascending),
            "desc" | "descending" | "-1" => Ok(SortOrder::Descending),
            _ => Err(CursorError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// Decoded cursor envelope.
///
/// `timestamp` is the Unix time (seconds) the cursor was minted and `ttl` its
/// validity in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamCursor {
    #[serde(rename = "type")]
    pub cursor_type: CursorType,
    pub value: Value,
    pub timestamp: i64,
    pub ttl: i64,
}

impl StreamCursor {
    /// Returns true if `now` (Unix seconds) is past the validity window.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.timestamp.saturating_add(self.ttl)
    }

    /// Reads the value as a millisecond timestamp.
    pub fn timestamp_millis(&self) -> Result<i64, CursorError> {
        self.value
            .as_i64()
            .ok_or_else(|| self.invalid_value("is not an integer"))
    }

    /// Reads the value as an identifier.
    pub fn id(&self) -> Result<&str, CursorError> {
        self.value
            .as_str()
            .ok_or_else(|| self.invalid_value("is not a string"))
    }

    /// Reads the value as a row offset.
    pub fn offset(&self) -> Result<u64, CursorError> {
        self.value
            .as_u64()
            .ok_or_else(|| self.invalid_value("is not a non-negative integer"))
    }

    fn invalid_value(&self, reason: &str) -> CursorError {
        CursorError::InvalidValue {
            cursor_type: self.cursor_type,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cursor(cursor_type: CursorType, value: Value) -> StreamCursor {
        StreamCursor {
            cursor_type,
            value,
            timestamp: 1_700_000_000,
            ttl: 60,
        }
    }

    #[test]
    fn test_cursor_type_parse() {
        assert_eq!("ID".parse::<CursorType>().unwrap(), CursorType::Id);
        assert_eq!(
            "timestamp".parse::<CursorType>().unwrap(),
            CursorType::Timestamp
        );
        assert!(matches!(
            "page".parse::<CursorType>(),
            Err(CursorError::UnknownType(_))
        ));
    }

    #[test]
    fn test_cursor_type_wire_names() {
        assert_eq!(serde_json::to_value(CursorType::Id).unwrap(), json!("id"));
        assert_eq!(
            serde_json::to_value(CursorType::Offset).unwrap(),
            json!("offset")
        );
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!("-1".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let c = cursor(CursorType::Id, json!("a"));
        assert!(!c.is_expired_at(1_700_000_060));
        assert!(c.is_expired_at(1_700_000_061));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(
            cursor(CursorType::Timestamp, json!(1234)).timestamp_millis(),
            Ok(1234)
        );
        assert_eq!(cursor(CursorType::Id, json!("abc")).id(), Ok("abc"));
        assert_eq!(cursor(CursorType::Offset, json!(40)).offset(), Ok(40));
        assert!(cursor(CursorType::Offset, json!(-1)).offset().is_err());
        assert!(cursor(CursorType::Id, json!(7)).id().is_err());
    }
}
