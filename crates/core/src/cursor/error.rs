use thiserror::Error;

use super::CursorType;

/// Errors that can occur when minting or consuming pagination cursors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("invalid pagination token: token is empty")]
    Empty,
    #[error("invalid pagination token: {0}")]
    Malformed(String),
    #[error("invalid pagination token: token has expired")]
    Expired,
    #[error("invalid pagination token: {cursor_type} cursor value {reason}")]
    InvalidValue {
        cursor_type: CursorType,
        reason: String,
    },
    #[error("Failed to serialize cursor value: {0}")]
    Serialize(String),
    #[error("No record to build the next cursor from")]
    MissingRecord,
    #[error("Cannot generate a {0} cursor from a record")]
    UnsupportedType(CursorType),
    #[error("Unknown cursor type: {0}")]
    UnknownType(String),
    #[error("Unknown sort order: {0}")]
    UnknownSortOrder(String),
}

impl CursorError {
    /// Returns true if the error was caused by input a client supplied.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Empty
                | Self::Malformed(_)
                | Self::Expired
                | Self::InvalidValue { .. }
                | Self::UnknownType(_)
                | Self::UnknownSortOrder(_)
        )
    }
}

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, CursorError>;
