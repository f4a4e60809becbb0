//! RocksDB-backed world state.
//!
//! One RocksDB instance per node, holding both logical column families as
//! key prefixes in the layout the ledger tooling expects:
//!
//! - `state:<channel>:<key>`: UTF-8 value bytes,
//! - `version:<channel>:<key>`: JSON-encoded [`Version`].
//!
//! A transaction's writes go through a `WriteBatch` so value and version
//! updates land atomically relative to readers of the same instance.

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};

use crate::error::StorageError;
use crate::types::{RwSet, Version};

use super::WorldState;

/// Configuration for [`RocksDbWorldState`].
#[derive(Clone, Debug)]
pub struct RocksDbWorldStateConfig {
    /// Filesystem path of the `worldstate/` database directory.
    pub path: String,
    /// Channel whose namespace this store serves.
    pub channel: String,
    /// Whether to create the database if it does not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbWorldStateConfig {
    fn default() -> Self {
        Self {
            path: "data/worldstate".to_string(),
            channel: "default".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`WorldState`].
pub struct RocksDbWorldState {
    db: DB,
    channel: String,
}

impl RocksDbWorldState {
    /// Opens (or creates) the world-state database at the configured path.
    pub fn open(cfg: &RocksDbWorldStateConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);

        let db = DB::open(&opts, Path::new(&cfg.path))?;
        Ok(Self {
            db,
            channel: cfg.channel.clone(),
        })
    }

    fn state_key(&self, key: &str) -> String {
        format!("state:{}:{}", self.channel, key)
    }

    fn version_key(&self, key: &str) -> String {
        format!("version:{}:{}", self.channel, key)
    }

    fn decode_version(raw: &[u8]) -> Result<Version, StorageError> {
        serde_json::from_slice(raw)
            .map_err(|e| StorageError::Corrupted(format!("version record: {e}")))
    }
}

impl WorldState for RocksDbWorldState {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(self.state_key(key))? {
            None => Ok(None),
            Some(raw) => String::from_utf8(raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupted(format!("state value at '{key}': {e}"))),
        }
    }

    fn get_version(&self, key: &str) -> Result<Option<Version>, StorageError> {
        match self.db.get(self.version_key(key))? {
            None => Ok(None),
            Some(raw) => Self::decode_version(&raw).map(Some),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.put(self.state_key(key), value.as_bytes())?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.db.delete(self.state_key(key))?;
        Ok(())
    }

    fn apply(&mut self, rw_set: &RwSet, block_num: u64, tx_num: u64) -> Result<(), StorageError> {
        let version = serde_json::to_vec(&Version::new(block_num, tx_num))?;

        let mut batch = WriteBatch::default();
        for write in &rw_set.writes {
            match &write.value {
                Some(value) => batch.put(self.state_key(&write.key), value.as_bytes()),
                None => batch.delete(self.state_key(&write.key)),
            }
            batch.put(self.version_key(&write.key), &version);
        }
        self.db.write(batch)?;
        Ok(())
    }

    fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let namespace = format!("state:{}:", self.channel);
        let start = format!("{namespace}{prefix}");

        let mut keys = Vec::new();
        for entry in self
            .db
            .iterator(IteratorMode::From(start.as_bytes(), Direction::Forward))
        {
            let (raw_key, _) = entry?;
            let full = String::from_utf8(raw_key.to_vec())
                .map_err(|e| StorageError::Corrupted(format!("state key: {e}")))?;
            match full.strip_prefix(&namespace) {
                Some(user_key) if user_key.starts_with(prefix) => {
                    keys.push(user_key.to_string());
                }
                _ => break,
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorldState;
    use crate::types::WriteEntry;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RocksDbWorldState) {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbWorldStateConfig {
            path: tmp.path().to_string_lossy().to_string(),
            channel: "default".to_string(),
            create_if_missing: true,
        };
        let state = RocksDbWorldState::open(&cfg).expect("open RocksDB");
        (tmp, state)
    }

    fn write(key: &str, value: Option<&str>) -> WriteEntry {
        WriteEntry {
            key: key.into(),
            value: value.map(Into::into),
        }
    }

    #[test]
    fn apply_persists_values_and_versions() {
        let (_tmp, mut state) = open_temp();
        let set = RwSet {
            reads: vec![],
            writes: vec![write("balance:Alice", Some("500")), write("gone", None)],
        };
        state.apply(&set, 1, 0).unwrap();

        assert_eq!(state.get("balance:Alice").unwrap().as_deref(), Some("500"));
        assert_eq!(state.get("gone").unwrap(), None);
        assert_eq!(
            state.get_version("gone").unwrap(),
            Some(Version::new(1, 0))
        );
    }

    #[test]
    fn prefix_scan_stays_inside_the_namespace() {
        let (_tmp, mut state) = open_temp();
        for key in ["balance:Alice", "balance:Bob", "totalSupply"] {
            state.put(key, "1").unwrap();
        }
        // A raw version record that must not leak into state scans.
        state
            .apply(
                &RwSet {
                    reads: vec![],
                    writes: vec![write("balance:Zed", Some("9"))],
                },
                0,
                0,
            )
            .unwrap();

        let keys = state.keys_by_prefix("balance:").unwrap();
        assert_eq!(keys, vec!["balance:Alice", "balance:Bob", "balance:Zed"]);
    }

    #[test]
    fn reopen_preserves_state() {
        let tmp = TempDir::new().unwrap();
        let cfg = RocksDbWorldStateConfig {
            path: tmp.path().to_string_lossy().to_string(),
            channel: "default".to_string(),
            create_if_missing: true,
        };

        {
            let mut state = RocksDbWorldState::open(&cfg).unwrap();
            state
                .apply(
                    &RwSet {
                        reads: vec![],
                        writes: vec![write("k", Some("v"))],
                    },
                    2,
                    1,
                )
                .unwrap();
        }

        let state = RocksDbWorldState::open(&cfg).unwrap();
        assert_eq!(state.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(state.get_version("k").unwrap(), Some(Version::new(2, 1)));
    }
}
