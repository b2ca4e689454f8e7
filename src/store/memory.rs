//! In-process store backed by a map

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{parse_i64, PersistentStore, StoreError};

/// Keeps values in memory; nothing survives the process
///
/// Integers are stored in their decimal form so a slot written with
/// `put_string` and read with `get_i64` behaves like it does on disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistentStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StoreError> {
        match self.values().get(key) {
            Some(raw) => parse_i64(key, raw),
            None => Ok(default),
        }
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_int_slots() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put_string("payload", "{}").unwrap();
        store.put_i64("expires_at", 99).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_string("payload").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get_i64("expires_at", 0).unwrap(), 99);
        assert_eq!(store.get_string("expires_at").unwrap().as_deref(), Some("99"));
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.remove("nothing").unwrap();
        assert_eq!(store.get_i64("nothing", 5).unwrap(), 5);
    }
}
