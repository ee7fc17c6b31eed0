pub mod collection;
pub mod database;
pub mod document;
pub mod memory;
mod snapshot;

pub use collection::{Collection, Patch, Record};
pub use database::Database;
pub use document::{
    DocumentStore, Filter, RecordId, StoreError, StoreResult, Update, UpdateOp, ID_FIELD,
};
pub use memory::{MemoryStore, StoreSnapshot};
pub use snapshot::{load_store, save_store};
