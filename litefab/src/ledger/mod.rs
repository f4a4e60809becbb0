//! Append-only block ledger.
//!
//! Blocks are stored keyed by header number with a hash-to-number index and
//! a `meta:latest` pointer. The stored hash of a block is
//! the digest of `canonical(header)`, each `canonical(tx)`, and
//! `canonical(metadata)` concatenated in that order; see
//! [`Block::stored_hash`]. Implementations must never let a reader observe
//! the hash index or latest pointer ahead of the block body; backends here
//! achieve that by writing the body first (or batching the writes).

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::Block;

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryLedger;
pub use self::rocksdb::{RocksDbLedger, RocksDbLedgerConfig};

/// Where a transaction landed: block number and index within the block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxLocation {
    pub block_num: u64,
    pub tx_num: u64,
}

/// Abstract append-only block store.
pub trait LedgerStore {
    /// Persists a block keyed by its header number, maintains the
    /// hash index and latest pointer, and returns the stored hash.
    fn put_block(&mut self, block: &Block) -> Result<String, StorageError>;

    /// Fetches a block by number, if present.
    fn get_block(&self, number: u64) -> Result<Option<Block>, StorageError>;

    /// Fetches a block through the hash index.
    fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>, StorageError>;

    /// Highest committed block number; `None` on an empty ledger.
    fn latest_block_number(&self) -> Result<Option<u64>, StorageError>;

    /// Records where a transaction was committed, enabling tx lookup.
    fn put_tx_index(&mut self, tx_id: &str, block_num: u64, tx_num: u64)
        -> Result<(), StorageError>;

    /// Looks up a transaction's position through the tx index.
    fn get_tx_location(&self, tx_id: &str) -> Result<Option<TxLocation>, StorageError>;
}
