//! Keyset pagination cursors.
//!
//! A cursor is an opaque token minted from the last row of a page. The next
//! request hands it back and gets a range filter that continues after that
//! row, so deep pages cost the same as the first one.

mod codec;
mod error;
mod filter;
mod manager;
mod record;
mod types;

pub use codec::{decode, encode, new_cursor};
pub use error::{CursorError, Result};
pub use filter::{build_filter, Comparison, Condition, CursorFilter, FilterValue};
pub use manager::{CursorManager, DEFAULT_CURSOR_TTL};
pub use record::{cursor_value, CursorRecord, ID_FIELD, UPDATED_AT_FIELD};
pub use types::{CursorType, SortOrder, StreamCursor};
