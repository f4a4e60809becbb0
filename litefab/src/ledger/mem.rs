//! In-memory ledger.
//!
//! Keeps blocks in a `BTreeMap` keyed by number with hash and tx indexes
//! alongside. Used by unit tests, the scenario suite, and simulations.

use std::collections::{BTreeMap, HashMap};

use crate::error::StorageError;
use crate::types::Block;

use super::{LedgerStore, TxLocation};

/// In-memory implementation of [`LedgerStore`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    blocks: BTreeMap<u64, Block>,
    by_hash: HashMap<String, u64>,
    tx_index: HashMap<String, TxLocation>,
    latest: Option<u64>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl LedgerStore for InMemoryLedger {
    fn put_block(&mut self, block: &Block) -> Result<String, StorageError> {
        let hash = block
            .stored_hash()
            .map_err(|e| StorageError::Codec(e.to_string()))?;
        let number = block.header.number;

        self.blocks.insert(number, block.clone());
        self.by_hash.insert(hash.clone(), number);
        self.latest = Some(self.latest.map_or(number, |latest| latest.max(number)));
        Ok(hash)
    }

    fn get_block(&self, number: u64) -> Result<Option<Block>, StorageError> {
        Ok(self.blocks.get(&number).cloned())
    }

    fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>, StorageError> {
        match self.by_hash.get(hash) {
            Some(number) => self.get_block(*number),
            None => Ok(None),
        }
    }

    fn latest_block_number(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.latest)
    }

    fn put_tx_index(
        &mut self,
        tx_id: &str,
        block_num: u64,
        tx_num: u64,
    ) -> Result<(), StorageError> {
        self.tx_index
            .insert(tx_id.to_string(), TxLocation { block_num, tx_num });
        Ok(())
    }

    fn get_tx_location(&self, tx_id: &str) -> Result<Option<TxLocation>, StorageError> {
        Ok(self.tx_index.get(tx_id).copied())
    }
}
