//! Opaque-blob persistence for saved routes and booked tickets.
//!
//! The tracking engine itself is ephemeral per session; this store exists
//! for the surrounding app, which saves routes and tickets as JSON blobs it
//! interprets on its own. Keys are caller-chosen strings.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::traits::KeyValueStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Single-file JSON store.
///
/// The whole map is rewritten through a temporary file on every write, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
