//! In-memory world state.
//!
//! Backed by `BTreeMap`s so prefix scans come out in key order without any
//! extra work. Useful for unit tests, the scenario suite, and simulations.

use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::types::{RwSet, Version};

use super::WorldState;

/// In-memory implementation of [`WorldState`].
#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    values: BTreeMap<String, String>,
    versions: BTreeMap<String, Version>,
}

impl InMemoryWorldState {
    /// Creates a new, empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently holding a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no key holds a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl WorldState for InMemoryWorldState {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn get_version(&self, key: &str) -> Result<Option<Version>, StorageError> {
        Ok(self.versions.get(key).copied())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }

    fn apply(&mut self, rw_set: &RwSet, block_num: u64, tx_num: u64) -> Result<(), StorageError> {
        for write in &rw_set.writes {
            match &write.value {
                Some(value) => {
                    self.values.insert(write.key.clone(), value.clone());
                }
                None => {
                    self.values.remove(&write.key);
                }
            }
            self.versions
                .insert(write.key.clone(), Version::new(block_num, tx_num));
        }
        Ok(())
    }

    fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .values
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
