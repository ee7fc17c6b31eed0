use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::document::{
    lookup, DocumentStore, Filter, RecordId, StoreError, StoreResult, Update, ID_FIELD,
};

/// Documents and index definitions of a single collection
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CollectionData {
    pub documents: Vec<Value>,
    pub unique_fields: Vec<String>,
}

impl CollectionData {
    /// Check `candidate` against every unique field of every other document.
    /// Null or missing values never collide.
    fn check_unique(&self, collection: &str, candidate: &Value, skip: Option<usize>) -> StoreResult<()> {
        let mut fields: Vec<&str> = self.unique_fields.iter().map(String::as_str).collect();
        fields.push(ID_FIELD);

        for field in fields {
            let value = match lookup(candidate, field) {
                Some(v) if !v.is_null() => v,
                _ => continue,
            };
            let clash = self
                .documents
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != skip)
                .any(|(_, existing)| lookup(existing, field) == Some(value));
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Point-in-time copy of every collection, used for persistence
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub collections: BTreeMap<String, CollectionData>,
}

/// In-process document store. Every single-document operation runs under one
/// write lock, so `inc` updates and unique-index checks are atomic.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, CollectionData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            collections: RwLock::new(snapshot.collections),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            collections: self.collections.read().clone(),
        }
    }

    /// Number of documents held by `collection`
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|data| data.documents.len())
            .unwrap_or(0)
    }
}

impl DocumentStore for MemoryStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|data| data.documents.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|data| {
                data.documents
                    .iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_one(&self, collection: &str, mut document: Value) -> StoreResult<RecordId> {
        let object = document.as_object_mut().ok_or_else(|| {
            StoreError::InvalidDocument("documents must be JSON objects".to_string())
        })?;

        let id = match object.get(ID_FIELD) {
            Some(Value::String(existing)) => RecordId::from(existing.as_str()),
            Some(Value::Null) | None => {
                let id = RecordId::generate();
                object.insert(ID_FIELD.to_string(), Value::from(&id));
                id
            }
            Some(_) => {
                return Err(StoreError::InvalidDocument(
                    "`_id` must be a string".to_string(),
                ))
            }
        };

        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();
        data.check_unique(collection, &document, None)?;
        data.documents.push(document);
        Ok(id)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let data = match collections.get_mut(collection) {
            Some(data) => data,
            None => return Ok(0),
        };
        let index = match data.documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => index,
            None => return Ok(0),
        };

        // Work on a copy so a failed update or index violation leaves the original intact
        let mut updated = data.documents[index].clone();
        update.apply(&mut updated)?;
        data.check_unique(collection, &updated, Some(index))?;
        data.documents[index] = updated;
        Ok(1)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let data = match collections.get_mut(collection) {
            Some(data) => data,
            None => return Ok(0),
        };
        match data.documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                data.documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let data = match collections.get_mut(collection) {
            Some(data) => data,
            None => return Ok(0),
        };
        let before = data.documents.len();
        data.documents.retain(|doc| !filter.matches(doc));
        Ok((before - data.documents.len()) as u64)
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();
        if data.unique_fields.iter().any(|existing| existing == field) {
            return Ok(());
        }

        let mut seen = Vec::new();
        for doc in &data.documents {
            if let Some(value) = lookup(doc, field).filter(|v| !v.is_null()) {
                if seen.contains(&value) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        field: field.to_string(),
                    });
                }
                seen.push(value);
            }
        }

        data.unique_fields.push(field.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_users() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_unique_index("users", "username").unwrap();
        store.create_unique_index("users", "email").unwrap();
        store
            .insert_one("users", json!({ "username": "ada", "email": "ada@example.com" }))
            .unwrap();
        store
    }

    #[test]
    fn test_insert_assigns_id() {
        let store = MemoryStore::new();
        let id = store.insert_one("notes", json!({ "title": "Cells" })).unwrap();

        let found = store.find_one("notes", &Filter::by_id(&id)).unwrap().unwrap();
        assert_eq!(found["title"], "Cells");
        assert_eq!(found["_id"], id.as_str());

        assert!(matches!(
            store.insert_one("notes", json!(["not", "an", "object"])),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_unique_index_on_insert_and_update() {
        let store = store_with_users();

        let duplicate = store.insert_one("users", json!({ "username": "ada", "email": "other@example.com" }));
        assert!(matches!(
            duplicate,
            Err(StoreError::DuplicateKey { ref field, .. }) if field == "username"
        ));

        store
            .insert_one("users", json!({ "username": "bob", "email": "bob@example.com" }))
            .unwrap();
        let clash = store.update_one(
            "users",
            &Filter::eq("username", "bob"),
            &Update::new().set("email", "ada@example.com"),
        );
        assert!(matches!(clash, Err(StoreError::DuplicateKey { .. })));

        // The failed update must not have leaked into the stored document
        let bob = store.find_one("users", &Filter::eq("username", "bob")).unwrap().unwrap();
        assert_eq!(bob["email"], "bob@example.com");
    }

    #[test]
    fn test_unique_index_rejects_existing_duplicates() {
        let store = MemoryStore::new();
        store.insert_one("users", json!({ "email": "same@example.com" })).unwrap();
        store.insert_one("users", json!({ "email": "same@example.com" })).unwrap();
        assert!(store.create_unique_index("users", "email").is_err());
    }

    #[test]
    fn test_delete_operations() {
        let store = MemoryStore::new();
        for title in ["a", "b", "c"] {
            store
                .insert_one("quizzes", json!({ "module_id": "m1", "title": title }))
                .unwrap();
        }
        store.insert_one("quizzes", json!({ "module_id": "m2", "title": "d" })).unwrap();

        assert_eq!(store.delete_one("quizzes", &Filter::eq("title", "a")).unwrap(), 1);
        assert_eq!(store.delete_many("quizzes", &Filter::eq("module_id", "m1")).unwrap(), 2);
        assert_eq!(store.delete_many("quizzes", &Filter::eq("module_id", "m1")).unwrap(), 0);
        assert_eq!(store.count("quizzes"), 1);
        assert_eq!(store.delete_many("missing", &Filter::All).unwrap(), 0);
    }

    #[test]
    fn test_update_missing_document() {
        let store = MemoryStore::new();
        let matched = store
            .update_one("courses", &Filter::eq("title", "x"), &Update::new().set("title", "y"))
            .unwrap();
        assert_eq!(matched, 0);
    }
}
