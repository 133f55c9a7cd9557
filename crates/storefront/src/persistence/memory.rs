//! In-process key-value store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{KeyValueStore, PersistenceError};

/// A key-value store that lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let values = self.values.read().map_err(|_| PersistenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values
            .write()
            .map_err(|_| PersistenceError::Poisoned)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.values
            .write()
            .map_err(|_| PersistenceError::Poisoned)?
            .remove(key);
        Ok(())
    }
}
