//! JSON document persistence.
//!
//! Every ledger persists its whole state as one JSON document under a data
//! directory (`services.json`, `absences.json`, `infractions.json`,
//! `monitoring.json`). The contract is read-modify-write on whole documents:
//! a missing or unreadable file loads as the default empty shape, and saves
//! go through a temp file + rename so a crash never leaves a truncated
//! document behind.
//!
//! I/O here is synchronous on purpose: callers hold their state lock across
//! the whole load→mutate→save cycle, so no await point can interleave two
//! operations on the same document.

use crate::error::{ConcessError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// File-backed store for named JSON documents.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| {
            ConcessError::Storage(format!(
                "Failed to create data directory '{}': {}",
                data_dir.display(),
                e
            ))
        })?;
        Ok(Self { data_dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    /// Load a document by logical name.
    ///
    /// A missing file yields the default empty shape. A corrupt file also
    /// yields the default, with a warning on stderr, so one bad write can
    /// never wedge the bot at startup.
    pub fn load<T>(&self, name: &str) -> T
    where
        T: Default + DeserializeOwned,
    {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return T::default(),
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!(
                    "Warning: document '{}' is corrupt ({}), starting from an empty document",
                    path.display(),
                    e
                );
                T::default()
            }
        }
    }

    /// Save a document under its logical name.
    ///
    /// The document is written to a temp file then renamed into place, so
    /// readers either see the previous version or the new one in full.
    pub fn save<T: Serialize>(&self, name: &str, doc: &T) -> Result<()> {
        let path = self.path_for(name);
        let tmp_path = self.data_dir.join(format!("{}.json.tmp", name));

        let raw = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp_path, raw).map_err(|e| {
            ConcessError::Storage(format!("Failed to write '{}': {}", tmp_path.display(), e))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            ConcessError::Storage(format!("Failed to replace '{}': {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct TestDoc {
        entries: Vec<String>,
        counter: u32,
    }

    fn setup_store() -> (TempDir, Store) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::new(temp_dir.path()).expect("Failed to create store");
        (temp_dir, store)
    }

    #[test]
    fn test_load_missing_returns_default() {
        let (_temp_dir, store) = setup_store();

        let doc: TestDoc = store.load("nothing_here");
        assert_eq!(doc, TestDoc::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_temp_dir, store) = setup_store();

        let doc = TestDoc {
            entries: vec!["a".to_string(), "b".to_string()],
            counter: 7,
        };
        store.save("roundtrip", &doc).unwrap();

        let loaded: TestDoc = store.load("roundtrip");
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_corrupt_file_returns_default() {
        let (temp_dir, store) = setup_store();

        std::fs::write(temp_dir.path().join("broken.json"), "{not json at all").unwrap();

        let doc: TestDoc = store.load("broken");
        assert_eq!(doc, TestDoc::default());
    }

    #[test]
    fn test_save_overwrites_previous_document() {
        let (_temp_dir, store) = setup_store();

        store
            .save("doc", &TestDoc { entries: vec!["old".to_string()], counter: 1 })
            .unwrap();
        store
            .save("doc", &TestDoc { entries: vec!["new".to_string()], counter: 2 })
            .unwrap();

        let loaded: TestDoc = store.load("doc");
        assert_eq!(loaded.entries, vec!["new".to_string()]);
        assert_eq!(loaded.counter, 2);
    }

    #[test]
    fn test_creates_data_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let store = Store::new(&nested).unwrap();
        store.save("doc", &TestDoc::default()).unwrap();
        assert!(nested.join("doc.json").exists());
    }
}
