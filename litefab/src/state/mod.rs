//! Versioned world-state store.
//!
//! The world state is a KV space whose entries carry two co-located
//! attributes: the value and the version `(blockNum, txNum)` of the
//! transaction that last wrote it. Endorsers only read; versions are only
//! ever written by the committer through [`WorldState::apply`]. Commit-time
//! MVCC validation compares recorded read versions against current ones
//! with strict equality, including the never-written-vs-present
//! distinction.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::policy::EndorsementPolicy;
use crate::types::{ReadEntry, RwSet, Version};

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryWorldState;
pub use self::rocksdb::{RocksDbWorldState, RocksDbWorldStateConfig};

/// User-key prefix under which chaincode metadata lives.
///
/// Metadata is written directly by the committer, outside the versioned
/// MVCC space, so deploying a chaincode never conflicts with reads.
pub const CHAINCODE_META_PREFIX: &str = "chaincode:";

/// Descriptor of a deployed chaincode, stored at DEPLOY commit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaincodeMetadata {
    pub chaincode_id: String,
    pub version: String,
    pub endorsement_policy: EndorsementPolicy,
}

impl ChaincodeMetadata {
    /// Metadata for a freshly deployed chaincode.
    pub fn deployed(chaincode_id: impl Into<String>, policy: EndorsementPolicy) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            version: "1.0".into(),
            endorsement_policy: policy,
        }
    }
}

/// Abstract versioned KV store for one channel's world state.
///
/// Implementations can be backed by in-memory maps or RocksDB. The raw
/// mutators `put`/`delete` exist for [`apply`](WorldState::apply) and
/// tooling; transaction writes always flow through `apply` so versions
/// stay consistent.
pub trait WorldState {
    /// Current value of `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Version of the last committed write to `key`; `None` if the key has
    /// never been written (a delete still leaves a version behind).
    fn get_version(&self, key: &str) -> Result<Option<Version>, StorageError>;

    /// Raw value write, without version stamping.
    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Raw value delete, without version stamping.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    /// Applies a transaction's write set atomically with respect to other
    /// committers: each write entry updates the value (deleting when the
    /// value is absent) and stamps version `(block_num, tx_num)`.
    fn apply(&mut self, rw_set: &RwSet, block_num: u64, tx_num: u64) -> Result<(), StorageError>;

    /// Keys in the channel namespace starting with `prefix`, in order.
    fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Looks up the metadata entry of a deployed chaincode.
    fn get_chaincode_metadata(
        &self,
        chaincode_id: &str,
    ) -> Result<Option<ChaincodeMetadata>, StorageError> {
        match self.get(&format!("{CHAINCODE_META_PREFIX}{chaincode_id}"))? {
            None => Ok(None),
            Some(raw) => {
                let meta = serde_json::from_str(&raw).map_err(|e| {
                    StorageError::Corrupted(format!("chaincode metadata '{chaincode_id}': {e}"))
                })?;
                Ok(Some(meta))
            }
        }
    }

    /// Stores the metadata entry for a deployed chaincode.
    fn put_chaincode_metadata(&mut self, meta: &ChaincodeMetadata) -> Result<(), StorageError> {
        let raw = serde_json::to_string(meta)?;
        self.put(&format!("{CHAINCODE_META_PREFIX}{}", meta.chaincode_id), &raw)
    }

    /// Validates a read set against the current state: every recorded
    /// version must equal the current version exactly. Returns `false` at
    /// the first mismatch.
    fn validate_read_set(&self, reads: &[ReadEntry]) -> Result<bool, StorageError> {
        for read in reads {
            if self.get_version(&read.key)? != read.version {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
