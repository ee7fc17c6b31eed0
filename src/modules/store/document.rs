use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io;

/// Field every stored document is keyed by
pub const ID_FIELD: &str = "_id";

/// Opaque document identifier, 12 random bytes rendered as 24 hex characters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        let bytes: [u8; 12] = rand::thread_rng().gen();
        RecordId(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        Value::String(id.0.clone())
    }
}

/// Errors raised by a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{field}` in `{collection}`")]
    DuplicateKey { collection: String, field: String },
    #[error("document in `{collection}` does not match its schema: {message}")]
    Schema { collection: String, message: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Selection of documents within a collection. Field names may be dotted paths
/// into nested objects, e.g. `security.password_reset_token`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn by_id(id: &RecordId) -> Self {
        Filter::eq(ID_FIELD, id)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// A null value matches both an explicit null and a missing field.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => match lookup(document, field) {
                Some(actual) => actual == expected,
                None => expected.is_null(),
            },
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// Resolve a dotted path inside a JSON document
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, key| current.get(key))
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Value),
    Inc(String, i64),
}

/// Ordered list of field operations applied atomically to a single document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path.to_string(), value.into()));
        self
    }

    pub fn inc(mut self, path: &str, delta: i64) -> Self {
        self.ops.push(UpdateOp::Inc(path.to_string(), delta));
        self
    }

    pub fn merge(mut self, other: Update) -> Self {
        self.ops.extend(other.ops);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Apply every operation to `document`, creating intermediate objects as needed
    pub fn apply(&self, document: &mut Value) -> StoreResult<()> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => {
                    if path == ID_FIELD {
                        return Err(StoreError::InvalidUpdate(
                            "the document id cannot be modified".to_string(),
                        ));
                    }
                    *slot_mut(document, path)? = value.clone();
                }
                UpdateOp::Inc(path, delta) => {
                    let slot = slot_mut(document, path)?;
                    let current = match slot {
                        Value::Null => 0,
                        Value::Number(n) => n.as_i64().ok_or_else(|| {
                            StoreError::InvalidUpdate(format!("`{}` is not an integer", path))
                        })?,
                        _ => {
                            return Err(StoreError::InvalidUpdate(format!(
                                "cannot increment non-numeric field `{}`",
                                path
                            )))
                        }
                    };
                    *slot = Value::from(current + delta);
                }
            }
        }
        Ok(())
    }
}

fn slot_mut<'a>(document: &'a mut Value, path: &str) -> StoreResult<&'a mut Value> {
    let mut current = document;
    for key in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let object = current.as_object_mut().ok_or_else(|| {
            StoreError::InvalidUpdate(format!("`{}` crosses a non-object value", path))
        })?;
        current = object.entry(key.to_string()).or_insert(Value::Null);
    }
    Ok(current)
}

/// Document-database collaborator. Documents are JSON objects keyed by `_id`.
pub trait DocumentStore: Send + Sync {
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>>;

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Insert a document, assigning an `_id` when it has none
    fn insert_one(&self, collection: &str, document: Value) -> StoreResult<RecordId>;

    /// Returns the number of matched documents (0 or 1)
    fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64>;

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let doc = json!({
            "_id": "abc",
            "username": "ada",
            "security": { "password_reset_token": "tok", "failed_login_attempts": 2 }
        });

        assert!(Filter::All.matches(&doc));
        assert!(Filter::eq("username", "ada").matches(&doc));
        assert!(!Filter::eq("username", "bob").matches(&doc));
        assert!(Filter::eq("security.password_reset_token", "tok").matches(&doc));
        assert!(Filter::or(vec![
            Filter::eq("username", "bob"),
            Filter::eq("_id", "abc"),
        ])
        .matches(&doc));
        assert!(!Filter::and(vec![
            Filter::eq("username", "ada"),
            Filter::eq("_id", "zzz"),
        ])
        .matches(&doc));

        // Missing fields only match an explicit null
        assert!(Filter::eq("verification_token", Value::Null).matches(&doc));
        assert!(!Filter::eq("verification_token", "tok").matches(&doc));
    }

    #[test]
    fn test_update_set_and_inc() {
        let mut doc = json!({ "_id": "abc", "security": { "failed_login_attempts": 4 } });

        Update::new()
            .inc("security.failed_login_attempts", 1)
            .inc("study_stats.quizzes_completed", 1)
            .set("profile.bio", "hello")
            .apply(&mut doc)
            .unwrap();

        assert_eq!(doc["security"]["failed_login_attempts"], 5);
        assert_eq!(doc["study_stats"]["quizzes_completed"], 1);
        assert_eq!(doc["profile"]["bio"], "hello");
    }

    #[test]
    fn test_update_rejects_bad_targets() {
        let mut doc = json!({ "_id": "abc", "title": "text" });

        assert!(matches!(
            Update::new().set("_id", "other").apply(&mut doc),
            Err(StoreError::InvalidUpdate(_))
        ));
        assert!(matches!(
            Update::new().inc("title", 1).apply(&mut doc),
            Err(StoreError::InvalidUpdate(_))
        ));
        assert!(matches!(
            Update::new().set("title.nested", 1).apply(&mut doc),
            Err(StoreError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn test_record_id_generation() {
        let first = RecordId::generate();
        let second = RecordId::generate();
        assert_eq!(first.as_str().len(), 24);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
