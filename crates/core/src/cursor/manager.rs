use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use super::filter::{build_filter, CursorFilter};
use super::record::{cursor_value, CursorRecord};
use super::{codec, CursorError, CursorType, Result, SortOrder, StreamCursor};

/// Default validity window for minted cursors.
pub const DEFAULT_CURSOR_TTL: Duration = Duration::from_secs(3600);

/// Mints and consumes opaque keyset pagination tokens.
///
/// Holds no per-client state: everything a continuation needs travels in
/// the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorManager {
    ttl: Duration,
}

impl Default for CursorManager {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_TTL)
    }
}

impl CursorManager {
    /// Creates a manager whose cursors stay valid for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Encodes `value` as a cursor of `cursor_type` minted now.
    pub fn encode_cursor<V: Serialize>(&self, cursor_type: CursorType, value: V) -> Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let cursor = codec::new_cursor(cursor_type, value, now(), ttl)?;
        codec::encode(&cursor)
    }

    /// Decodes a token. Empty or malformed tokens are errors.
    pub fn decode_cursor(&self, token: &str) -> Result<StreamCursor> {
        codec::decode(token)
    }

    /// Returns true if the token decodes.
    pub fn validate_cursor(&self, token: &str) -> bool {
        self.decode_cursor(token).is_ok()
    }

    /// Returns true if the token is undecodable or past its validity window.
    pub fn is_cursor_expired(&self, token: &str) -> bool {
        match self.decode_cursor(token) {
            Ok(cursor) => cursor.is_expired_at(now()),
            Err(_) => true,
        }
    }

    /// Builds the continuation filter for the page after `token`.
    ///
    /// `sort_field` and `sort_order` must match the ordering of the page the
    /// token was minted from. Expired tokens are rejected.
    pub fn build_cursor_filter(
        &self,
        token: &str,
        sort_field: &str,
        sort_order: SortOrder,
    ) -> Result<CursorFilter> {
        let cursor = self.decode_cursor(token)?;
        if cursor.is_expired_at(now()) {
            return Err(CursorError::Expired);
        }
        build_filter(&cursor, sort_field, sort_order)
    }

    /// Mints the cursor continuing after `last_record`.
    pub fn generate_next_cursor<R: CursorRecord>(
        &self,
        last_record: Option<&R>,
        cursor_type: CursorType,
        sort_field: &str,
    ) -> Result<String> {
        let value = cursor_value(last_record, cursor_type, sort_field)?;
        self.encode_cursor(cursor_type, value)
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}
