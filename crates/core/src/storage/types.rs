use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{RepositoryError, Result};

/// Partial update: top-level field names mapped to their new values.
pub type FieldUpdates = Map<String, Value>;

/// A record that can be stored in a repository and cached.
///
/// The cache layer only needs the identifier and the entity type name; all
/// other fields are opaque and travel through serde.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name used in cache keys and `NotFound` errors (e.g. `"Book"`).
    const ENTITY_TYPE: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> String;
}

/// Applies field updates to an entity by merging them into its JSON form.
///
/// Unknown fields are ignored by deserialization only if the entity type
/// allows it; a value of the wrong type yields `InvalidData`.
pub fn apply_field_updates<T: Entity>(entity: &T, updates: &FieldUpdates) -> Result<T> {
    let mut value =
        serde_json::to_value(entity).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    let Value::Object(fields) = &mut value else {
        return Err(RepositoryError::InvalidData(format!(
            "{} does not serialize to an object",
            T::ENTITY_TYPE
        )));
    };

    for (key, new_value) in updates {
        fields.insert(key.clone(), new_value.clone());
    }

    serde_json::from_value(value).map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        title: String,
        pages: u32,
    }

    impl Entity for Note {
        const ENTITY_TYPE: &'static str = "Note";

        fn id(&self) -> String {
            self.id.clone()
        }
    }

    fn note() -> Note {
        Note {
            id: "n1".to_string(),
            title: "Draft".to_string(),
            pages: 3,
        }
    }

    #[test]
    fn test_apply_field_updates_replaces_fields() {
        let mut updates = FieldUpdates::new();
        updates.insert("title".to_string(), json!("Final"));

        let updated = apply_field_updates(&note(), &updates).unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.pages, 3);
        assert_eq!(updated.id, "n1");
    }

    #[test]
    fn test_apply_field_updates_empty_is_identity() {
        let updated = apply_field_updates(&note(), &FieldUpdates::new()).unwrap();
        assert_eq!(updated, note());
    }

    #[test]
    fn test_apply_field_updates_wrong_type() {
        let mut updates = FieldUpdates::new();
        updates.insert("pages".to_string(), json!("many"));

        let err = apply_field_updates(&note(), &updates).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }
}
