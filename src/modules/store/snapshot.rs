use log::{info, warn};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use super::document::StoreResult;
use super::memory::{MemoryStore, StoreSnapshot};

/// Load a store from a JSON snapshot. A missing file yields an empty store;
/// a corrupt file is an error rather than a silent reset.
pub fn load_store(path: &Path) -> StoreResult<MemoryStore> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("No data file at {}, starting with an empty store", path.display());
            return Ok(MemoryStore::new());
        }
        Err(e) => return Err(e.into()),
    };

    let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(MemoryStore::from_snapshot(snapshot))
}

/// Persist the store as pretty JSON, replacing `path` atomically
pub fn save_store(store: &MemoryStore, path: &Path) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let data = serde_json::to_string_pretty(&store.snapshot())?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| {
        warn!("Failed to replace data file {}: {}", path.display(), e);
        e.error
    })?;
    Ok(())
}
