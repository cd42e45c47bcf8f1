use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use readthrough_core::cursor::CursorRecord;
use readthrough_core::storage::Entity;

/// A catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Creates a book stamped with the current time.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Book {
    const ENTITY_TYPE: &'static str = "book";

    fn id(&self) -> String {
        self.id.clone()
    }
}

impl CursorRecord for Book {
    fn cursor_id(&self) -> String {
        self.id.clone()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
