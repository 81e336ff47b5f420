use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::model::book::BookRecord;
use crate::domain::repository::CacheStore;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSONファイルによるCacheStore実装（localStorage相当）。
///
/// ファイルは `{"キー": "JSON文字列"}` のオブジェクト。自分のキー以外のエントリには触れない。
pub struct JsonFileStorage {
    path: PathBuf,
    key: String,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, JsonStoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), JsonStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CacheStore for JsonFileStorage {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Option<Vec<BookRecord>>, Self::Error> {
        let entries = self.read_entries()?;
        match entries.get(&self.key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, books: &[BookRecord]) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        entries.insert(self.key.clone(), serde_json::to_string(books)?);
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        if entries.remove(&self.key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
