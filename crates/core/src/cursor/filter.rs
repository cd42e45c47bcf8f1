//! Continuation filters for keyset pagination.
//!
//! A filter only works if the page it continues was ordered by the same
//! `(sort_field, sort_order)` pair; nothing here can check that.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::record::{CursorRecord, ID_FIELD};
use super::{CursorError, CursorType, Result, SortOrder, StreamCursor};

/// Comparison operator of a range condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    GreaterThan,
}

impl Comparison {
    fn for_order(order: SortOrder) -> Self {
        if order.is_descending() {
            Comparison::LessThan
        } else {
            Comparison::GreaterThan
        }
    }

    /// Document-store operator name.
    pub fn operator(self) -> &'static str {
        match self {
            Comparison::LessThan => "$lt",
            Comparison::GreaterThan => "$gt",
        }
    }

    fn holds<T: Ord>(self, left: T, right: T) -> bool {
        match self {
            Comparison::LessThan => left < right,
            Comparison::GreaterThan => left > right,
        }
    }
}

/// Right-hand side of a range condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Timestamp(DateTime<Utc>),
    Id(String),
}

/// `field <comparison> value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub comparison: Comparison,
    pub value: FilterValue,
}

/// Predicate selecting the rows after a cursor. Empty matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorFilter {
    condition: Option<Condition>,
}

impl CursorFilter {
    /// A filter with no condition.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.condition.is_none()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Renders the filter as a document-store query, e.g.
    /// `{"created_at": {"$lt": "2024-06-15T10:30:00.000Z"}}`.
    pub fn to_document(&self) -> Value {
        let Some(condition) = &self.condition else {
            return Value::Object(Map::new());
        };
        let value = match &condition.value {
            FilterValue::Timestamp(ts) => json!(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FilterValue::Id(id) => json!(id),
        };
        let mut range = Map::new();
        range.insert(condition.comparison.operator().to_string(), value);
        let mut document = Map::new();
        document.insert(condition.field.clone(), Value::Object(range));
        Value::Object(document)
    }

    /// Tests a record against the filter.
    ///
    /// Timestamps compare at millisecond precision, which is what a cursor
    /// stores. Identifier conditions compare the record's identifier.
    pub fn matches<R: CursorRecord>(&self, record: &R) -> bool {
        let Some(condition) = &self.condition else {
            return true;
        };
        match &condition.value {
            FilterValue::Timestamp(ts) => condition.comparison.holds(
                record.cursor_timestamp(&condition.field).timestamp_millis(),
                ts.timestamp_millis(),
            ),
            FilterValue::Id(id) => condition
                .comparison
                .holds(record.cursor_id().as_str(), id.as_str()),
        }
    }
}

/// Builds the continuation filter for a decoded cursor.
pub fn build_filter(
    cursor: &StreamCursor,
    sort_field: &str,
    sort_order: SortOrder,
) -> Result<CursorFilter> {
    let comparison = Comparison::for_order(sort_order);

    let condition = match cursor.cursor_type {
        CursorType::Offset => return Ok(CursorFilter::empty()),
        CursorType::Timestamp => {
            let millis = cursor.timestamp_millis()?;
            let ts = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                CursorError::InvalidValue {
                    cursor_type: CursorType::Timestamp,
                    reason: format!("{} is out of range", millis),
                }
            })?;
            Condition {
                field: sort_field.to_string(),
                comparison,
                value: FilterValue::Timestamp(ts),
            }
        }
        CursorType::Id => {
            let field = if sort_field.is_empty() {
                ID_FIELD
            } else {
                sort_field
            };
            Condition {
                field: field.to_string(),
                comparison,
                value: FilterValue::Id(cursor.id()?.to_string()),
            }
        }
    };

    Ok(CursorFilter {
        condition: Some(condition),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Row {
        id: String,
        created: DateTime<Utc>,
    }

    impl CursorRecord for Row {
        fn cursor_id(&self) -> String {
            self.id.clone()
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created
        }
    }

    fn cursor(cursor_type: CursorType, value: Value) -> StreamCursor {
        StreamCursor {
            cursor_type,
            value,
            timestamp: 0,
            ttl: 0,
        }
    }

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_timestamp_descending_is_less_than() {
        let millis = fixed_timestamp().timestamp_millis();
        let filter = build_filter(
            &cursor(CursorType::Timestamp, json!(millis)),
            "created_at",
            SortOrder::Descending,
        )
        .unwrap();

        assert_eq!(
            filter.condition(),
            Some(&Condition {
                field: "created_at".to_string(),
                comparison: Comparison::LessThan,
                value: FilterValue::Timestamp(fixed_timestamp()),
            })
        );
        assert_eq!(
            filter.to_document(),
            json!({"created_at": {"$lt": "2024-06-15T10:30:00.000Z"}})
        );
    }

    #[test]
    fn test_timestamp_ascending_is_greater_than() {
        let millis = fixed_timestamp().timestamp_millis();
        let filter = build_filter(
            &cursor(CursorType::Timestamp, json!(millis)),
            "updated_at",
            SortOrder::Ascending,
        )
        .unwrap();

        assert_eq!(
            filter.condition().map(|c| c.comparison),
            Some(Comparison::GreaterThan)
        );
    }

    #[test]
    fn test_id_defaults_to_primary_field() {
        let filter =
            build_filter(&cursor(CursorType::Id, json!("b7")), "", SortOrder::Ascending).unwrap();

        assert_eq!(filter.to_document(), json!({"_id": {"$gt": "b7"}}));
    }

    #[test]
    fn test_id_keeps_explicit_field() {
        let filter = build_filter(
            &cursor(CursorType::Id, json!("b7")),
            "slug",
            SortOrder::Descending,
        )
        .unwrap();

        assert_eq!(filter.to_document(), json!({"slug": {"$lt": "b7"}}));
    }

    #[test]
    fn test_offset_is_empty() {
        let filter = build_filter(
            &cursor(CursorType::Offset, json!(40)),
            "created_at",
            SortOrder::Descending,
        )
        .unwrap();

        assert!(filter.is_empty());
        assert_eq!(filter.to_document(), json!({}));
    }

    #[test]
    fn test_timestamp_value_must_be_numeric() {
        let result = build_filter(
            &cursor(CursorType::Timestamp, json!("yesterday")),
            "created_at",
            SortOrder::Descending,
        );
        assert!(matches!(result, Err(CursorError::InvalidValue { .. })));
    }

    #[test]
    fn test_matches_timestamp() {
        let filter = build_filter(
            &cursor(
                CursorType::Timestamp,
                json!(fixed_timestamp().timestamp_millis()),
            ),
            "created_at",
            SortOrder::Descending,
        )
        .unwrap();

        let older = Row {
            id: "a".to_string(),
            created: fixed_timestamp() - chrono::Duration::seconds(1),
        };
        let same = Row {
            id: "b".to_string(),
            created: fixed_timestamp(),
        };

        assert!(filter.matches(&older));
        assert!(!filter.matches(&same));
    }

    #[test]
    fn test_matches_ignores_sub_millisecond_precision() {
        let filter = build_filter(
            &cursor(
                CursorType::Timestamp,
                json!(fixed_timestamp().timestamp_millis()),
            ),
            "created_at",
            SortOrder::Ascending,
        )
        .unwrap();

        let same_millisecond = Row {
            id: "a".to_string(),
            created: fixed_timestamp() + chrono::Duration::microseconds(300),
        };

        assert!(!filter.matches(&same_millisecond));
    }

    #[test]
    fn test_matches_id() {
        let filter =
            build_filter(&cursor(CursorType::Id, json!("m")), "", SortOrder::Ascending).unwrap();

        let row = |id: &str| Row {
            id: id.to_string(),
            created: fixed_timestamp(),
        };

        assert!(filter.matches(&row("n")));
        assert!(!filter.matches(&row("m")));
        assert!(!filter.matches(&row("a")));
    }

    #[test]
    fn test_empty_matches_everything() {
        let row = Row {
            id: "x".to_string(),
            created: fixed_timestamp(),
        };
        assert!(CursorFilter::empty().matches(&row));
    }
}
