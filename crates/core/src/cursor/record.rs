use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{CursorError, CursorType, Result};

/// Primary identifier field of the document store.
pub const ID_FIELD: &str = "_id";

/// Sort field that selects the update timestamp instead of creation time.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// A row that can seed the next page's cursor and be tested against a
/// continuation filter.
pub trait CursorRecord {
    /// Identifier used by `id` cursors.
    fn cursor_id(&self) -> String;

    /// Creation time.
    fn created_at(&self) -> DateTime<Utc>;

    /// Last update time; defaults to the creation time.
    fn updated_at(&self) -> DateTime<Utc> {
        self.created_at()
    }

    /// Timestamp a `timestamp` cursor reads for `sort_field`.
    fn cursor_timestamp(&self, sort_field: &str) -> DateTime<Utc> {
        if sort_field == UPDATED_AT_FIELD {
            self.updated_at()
        } else {
            self.created_at()
        }
    }
}

/// Extracts the sort-key value a cursor of `cursor_type` stores for `record`.
pub fn cursor_value<R: CursorRecord>(
    record: Option<&R>,
    cursor_type: CursorType,
    sort_field: &str,
) -> Result<Value> {
    let record = record.ok_or(CursorError::MissingRecord)?;
    match cursor_type {
        CursorType::Timestamp => Ok(json!(record.cursor_timestamp(sort_field).timestamp_millis())),
        CursorType::Id => Ok(json!(record.cursor_id())),
        CursorType::Offset => Err(CursorError::UnsupportedType(cursor_type)),
    }
}
