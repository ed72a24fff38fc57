use std::fs;
use std::path::Path;

use tracing::info;

use super::error::StorageError;
use super::TripleStore;

impl TripleStore {
    /// Write the store to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| StorageError::io(path, e))?;

        info!(path = %path.display(), triples = self.len(), "Saved triple store");
        Ok(())
    }

    /// Read a store written by [`save`](Self::save).
    ///
    /// A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        let mut store: TripleStore = serde_json::from_str(&json)?;
        store.rebuild_index(path)?;

        info!(path = %path.display(), triples = store.len(), "Loaded triple store");
        Ok(store)
    }

    fn rebuild_index(&mut self, path: &Path) -> Result<(), StorageError> {
        self.index.clear();
        for (idx, stored) in self.triples.iter().enumerate() {
            if self.index.insert(stored.fingerprint.clone(), idx).is_some() {
                return Err(StorageError::DuplicateFingerprint {
                    path: path.to_path_buf(),
                    fingerprint: stored.fingerprint.to_string(),
                });
            }
        }
        Ok(())
    }
}
