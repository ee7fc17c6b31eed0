use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::document::{DocumentStore, Filter, RecordId, StoreError, StoreResult, Update};

/// A typed document living in a named collection
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> &RecordId;
}

/// Typed partial update for one record type. Implementations expose named
/// constructors covering exactly the mutable fields of their record.
pub trait Patch {
    type Target: Record;

    fn into_update(self) -> Update;
}

/// Typed view over one collection of a [`DocumentStore`]. Every document read
/// back is decoded into `T`, which is where schema mismatches surface.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    fn decode(document: Value) -> StoreResult<T> {
        serde_json::from_value(document).map_err(|e| StoreError::Schema {
            collection: T::COLLECTION.to_string(),
            message: e.to_string(),
        })
    }

    pub fn find_one(&self, filter: &Filter) -> StoreResult<Option<T>> {
        self.store
            .find_one(T::COLLECTION, filter)?
            .map(Self::decode)
            .transpose()
    }

    pub fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<T>> {
        self.find_one(&Filter::by_id(id))
    }

    pub fn find(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter)?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub fn insert(&self, record: &T) -> StoreResult<RecordId> {
        let document = serde_json::to_value(record)?;
        self.store.insert_one(T::COLLECTION, document)
    }

    /// Apply a typed patch; returns false when no document has that id
    pub fn update<P>(&self, id: &RecordId, patch: P) -> StoreResult<bool>
    where
        P: Patch<Target = T>,
    {
        let matched = self
            .store
            .update_one(T::COLLECTION, &Filter::by_id(id), &patch.into_update())?;
        Ok(matched > 0)
    }

    pub fn delete_by_id(&self, id: &RecordId) -> StoreResult<bool> {
        Ok(self.store.delete_one(T::COLLECTION, &Filter::by_id(id))? > 0)
    }

    pub fn delete_many(&self, filter: &Filter) -> StoreResult<u64> {
        self.store.delete_many(T::COLLECTION, filter)
    }

    pub fn create_unique_index(&self, field: &str) -> StoreResult<()> {
        self.store.create_unique_index(T::COLLECTION, field)
    }
}
