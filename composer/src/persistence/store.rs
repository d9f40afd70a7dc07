//! Key-value storage behind the persistence bridge.
//!
//! The bridge only needs three operations on string slots, so any backend
//! that can get, set and remove a string by key will do:
//!
//! | Backend        | Lifetime                | Used by            |
//! |----------------|-------------------------|--------------------|
//! | [`MemoryStore`] | process                 | tests, embedding   |
//! | [`SledStore`]   | on disk, across runs    | `txn-wizard`       |

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use sled::{Db, Tree};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// The stored bytes are not valid UTF-8.
    #[error("slot {0} does not hold text")]
    NotText(String),

    /// The backend refused a write for lack of space.
    #[error("storage quota of {limit} bytes exceeded")]
    QuotaExceeded { limit: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// A string-slot store. Implementations use interior mutability.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store with an optional byte quota, mimicking browser storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota: Some(limit),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.slots.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut slots = self.slots.lock();
        if let Some(limit) = self.quota {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > limit {
                return Err(StoreError::QuotaExceeded { limit });
            }
        }
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.slots.lock().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// Slots kept in one sled tree, flushed on every write so a crash never
/// loses a saved draft.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    slots: Tree,
}

impl SledStore {
    const TREE: &'static str = "session";

    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary directory and is removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let slots = db.open_tree(Self::TREE)?;
        Ok(Self { db, slots })
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.slots.get(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| StoreError::NotText(key.to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.slots.insert(key, value.as_bytes())?;
        self.flush()
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.slots.remove(key)?;
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("draft").unwrap(), None);
        store.set("draft", "{}").unwrap();
        assert_eq!(store.get("draft").unwrap().as_deref(), Some("{}"));
        store.set("draft", "{\"v\":1}").unwrap();
        assert_eq!(store.get("draft").unwrap().as_deref(), Some("{\"v\":1}"));
        store.remove("draft").unwrap();
        assert_eq!(store.get("draft").unwrap(), None);
        store.remove("draft").unwrap();
    }

    #[test]
    fn memory_store_basics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn sled_store_basics() {
        exercise(&SledStore::open_temporary().unwrap());
    }

    #[test]
    fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.set("signature", "data:,").unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get("signature").unwrap().as_deref(), Some("data:,"));
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let store = MemoryStore::with_quota(16);
        store.set("a", "12345").unwrap();
        match store.set("b", &"x".repeat(20)) {
            Err(StoreError::QuotaExceeded { limit: 16 }) => {}
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
        // Overwriting a slot only counts its new size.
        store.set("a", &"y".repeat(15)).unwrap();
    }
}
