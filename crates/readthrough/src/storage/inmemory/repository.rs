//! In-memory repository implementation.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use readthrough_core::cursor::{CursorFilter, CursorRecord, SortOrder, ID_FIELD};
use readthrough_core::storage::{
    apply_field_updates, Entity, FieldUpdates, Repository, RepositoryError, Result,
};

/// In-memory storage backend for a single entity type.
///
/// Uses a HashMap wrapped in `Arc<RwLock<_>>` for thread-safe access.
/// Data is not persisted and will be lost when the repository is dropped.
/// Clones share the same data and the same read counter.
#[derive(Debug)]
pub struct InMemoryRepository<T: Entity> {
    records: Arc<RwLock<HashMap<String, T>>>,
    reads: Arc<AtomicUsize>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for InMemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            reads: Arc::clone(&self.reads),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            reads: Arc::new(AtomicUsize::new(0)),
            _entity: PhantomData,
        }
    }

    /// Number of `get_by_id` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Entity + CursorRecord> InMemoryRepository<T> {
    /// Returns up to `limit` records after the cursor position.
    ///
    /// Records are ordered by `sort_field` (`_id` orders by identifier, any
    /// other field by the record's timestamp for that field) in
    /// `sort_order`, with the identifier as tiebreaker. The filter must have
    /// been built for the same field and order.
    pub async fn stream_page(
        &self,
        filter: &CursorFilter,
        sort_field: &str,
        sort_order: SortOrder,
        limit: usize,
    ) -> Vec<T> {
        let records = self.records.read().await;

        let mut page: Vec<T> = records
            .values()
            .filter(|record| filter.matches(*record))
            .cloned()
            .collect();

        page.sort_by(|a, b| {
            let ordering = compare_by(a, b, sort_field);
            if sort_order.is_descending() {
                ordering.reverse()
            } else {
                ordering
            }
        });
        page.truncate(limit);

        tracing::trace!(
            sort_field,
            %sort_order,
            limit,
            returned = page.len(),
            "Streamed page"
        );
        page
    }
}

fn compare_by<R: CursorRecord>(a: &R, b: &R, sort_field: &str) -> CmpOrdering {
    if sort_field.is_empty() || sort_field == ID_FIELD {
        return a.cursor_id().cmp(&b.cursor_id());
    }
    a.cursor_timestamp(sort_field)
        .cmp(&b.cursor_timestamp(sort_field))
        .then_with(|| a.cursor_id().cmp(&b.cursor_id()))
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get_by_id(&self, id: &str) -> Result<T> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.read().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(T::ENTITY_TYPE, id))
    }

    async fn create(&self, entity: &T) -> Result<()> {
        let id = entity.id();
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: T::ENTITY_TYPE,
                id,
            });
        }
        records.insert(id, entity.clone());
        Ok(())
    }

    async fn update(&self, id: &str, updates: &FieldUpdates) -> Result<()> {
        let mut records = self.records.write().await;
        let Some(current) = records.get(id) else {
            return Err(RepositoryError::not_found(T::ENTITY_TYPE, id));
        };

        let updated = apply_field_updates(current, updates)?;
        if updated.id() != id {
            return Err(RepositoryError::InvalidData(format!(
                "update may not change the {} id",
                T::ENTITY_TYPE
            )));
        }
        records.insert(id.to_string(), updated);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        if records.remove(id).is_none() {
            return Err(RepositoryError::not_found(T::ENTITY_TYPE, id));
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use readthrough_core::cursor::{CursorManager, CursorType};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        id: String,
        title: String,
        created_at: DateTime<Utc>,
    }

    impl Entity for Book {
        const ENTITY_TYPE: &'static str = "Book";

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
    }

    fn book(id: &str, minute: i64) -> Book {
        Book {
            id: id.to_string(),
            title: format!("Title {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    fn title_update(title: &str) -> FieldUpdates {
        let mut updates = FieldUpdates::new();
        updates.insert("title".to_string(), json!(title));
        updates
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryRepository::new();
        repo.create(&book("b1", 0)).await.unwrap();

        let fetched = repo.get_by_id("b1").await.unwrap();
        assert_eq!(fetched, book("b1", 0));
        assert_eq!(repo.read_count(), 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let repo = InMemoryRepository::<Book>::new();

        let err = repo.get_by_id("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let repo = InMemoryRepository::new();
        repo.create(&book("b1", 0)).await.unwrap();

        let result = repo.create(&book("b1", 5)).await;
        assert!(matches!(result, Err(RepositoryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let repo = InMemoryRepository::new();
        repo.create(&book("b1", 0)).await.unwrap();

        repo.update("b1", &title_update("Renamed")).await.unwrap();

        let fetched = repo.get_by_id("b1").await.unwrap();
        assert_eq!(fetched.title, "Renamed");
        assert_eq!(fetched.created_at, book("b1", 0).created_at);
    }

    #[tokio::test]
    async fn test_update_nonexistent() {
        let repo = InMemoryRepository::<Book>::new();

        let err = repo.update("missing", &title_update("X")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_cannot_change_id() {
        let repo = InMemoryRepository::new();
        repo.create(&book("b1", 0)).await.unwrap();

        let mut updates = FieldUpdates::new();
        updates.insert("id".to_string(), json!("b2"));

        let result = repo.update("b1", &updates).await;
        assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
        assert!(repo.exists("b1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let repo = InMemoryRepository::new();
        repo.create(&book("b1", 0)).await.unwrap();
        assert!(repo.exists("b1").await.unwrap());

        repo.delete("b1").await.unwrap();

        assert!(!repo.exists("b1").await.unwrap());
        assert!(repo.delete("b1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let repo = InMemoryRepository::new();
        let clone = repo.clone();

        clone.create(&book("b1", 0)).await.unwrap();
        repo.get_by_id("b1").await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(clone.read_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_pages_newest_first() {
        let repo = InMemoryRepository::new();
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            repo.create(&book(id, i as i64)).await.unwrap();
        }
        let manager = CursorManager::default();

        let first = repo
            .stream_page(&CursorFilter::empty(), "created_at", SortOrder::Descending, 2)
            .await;
        let ids: Vec<&str> = first.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["e", "d"]);

        let token = manager
            .generate_next_cursor(first.last(), CursorType::Timestamp, "created_at")
            .unwrap();
        let filter = manager
            .build_cursor_filter(&token, "created_at", SortOrder::Descending)
            .unwrap();
        let second = repo
            .stream_page(&filter, "created_at", SortOrder::Descending, 2)
            .await;

        let ids: Vec<&str> = second.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_stream_pages_by_id() {
        let repo = InMemoryRepository::new();
        for id in ["k3", "k1", "k2"] {
            repo.create(&book(id, 0)).await.unwrap();
        }
        let manager = CursorManager::default();

        let first = repo
            .stream_page(&CursorFilter::empty(), "", SortOrder::Ascending, 1)
            .await;
        let token = manager
            .generate_next_cursor(first.last(), CursorType::Id, "")
            .unwrap();
        let filter = manager
            .build_cursor_filter(&token, "", SortOrder::Ascending)
            .unwrap();
        let rest = repo.stream_page(&filter, "", SortOrder::Ascending, 10).await;

        assert_eq!(first[0].id, "k1");
        let ids: Vec<&str> = rest.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["k2", "k3"]);
    }
}
