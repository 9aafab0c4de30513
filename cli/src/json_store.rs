use std::io::ErrorKind;
use std::path::PathBuf;

use expander_protocol::store::KeyValueStore;
use expander_protocol::store::StoreError;
use expander_protocol::store::StoreKey;
use expander_protocol::store::StoreRecord;

use crate::atomic_write::persist_document;

/// Key-value store kept as one JSON document on disk.
///
/// Every `set` re-reads the file, merges the present keys, and replaces the file atomically, so
/// two processes sharing a store only ever lose whole keys to each other (last writer wins).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<StoreRecord, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StoreRecord::default()),
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(StoreRecord::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[StoreKey]) -> Result<StoreRecord, StoreError> {
        Ok(self.read_all()?.select(keys))
    }

    fn set(&mut self, record: StoreRecord) -> Result<(), StoreError> {
        let mut current = self.read_all()?;
        current.merge(record);
        let contents = serde_json::to_string_pretty(&current)?;
        persist_document(&self.path, &contents)
            .map_err(|err| StoreError::Backend(format!("{err:#}")))?;
        tracing::debug!(path = %self.path.display(), "store written");
        Ok(())
    }
}
