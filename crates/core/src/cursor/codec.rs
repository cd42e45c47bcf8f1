//! Token encoding: JSON envelope, then URL-safe base64.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Serialize;

use super::{CursorError, CursorType, Result, StreamCursor};

/// URL-safe alphabet; emits no padding and accepts tokens with or without it.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Builds an envelope minted at `now` (Unix seconds).
pub fn new_cursor<V: Serialize>(
    cursor_type: CursorType,
    value: V,
    now: i64,
    ttl_seconds: i64,
) -> Result<StreamCursor> {
    let value = serde_json::to_value(value).map_err(|e| CursorError::Serialize(e.to_string()))?;
    Ok(StreamCursor {
        cursor_type,
        value,
        timestamp: now,
        ttl: ttl_seconds,
    })
}

/// Encodes an envelope into an opaque token.
pub fn encode(cursor: &StreamCursor) -> Result<String> {
    let json = serde_json::to_vec(cursor).map_err(|e| CursorError::Serialize(e.to_string()))?;
    Ok(TOKEN_ENGINE.encode(json))
}

/// Decodes an opaque token. An empty token is always an error.
pub fn decode(token: &str) -> Result<StreamCursor> {
    if token.is_empty() {
        return Err(CursorError::Empty);
    }
    let json = TOKEN_ENGINE
        .decode(token)
        .map_err(|e| CursorError::Malformed(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| CursorError::Malformed(e.to_string()))
}
