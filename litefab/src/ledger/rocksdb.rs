//! RocksDB-backed ledger.
//!
//! Key layout inside the `ledger/` database:
//!
//! - `block:<n>`: JSON-encoded block body,
//! - `hash:<h>`: decimal block number,
//! - `meta:latest`: decimal latest block number,
//! - `tx:<txId>`: JSON-encoded [`TxLocation`].
//!
//! The block body is written in the same batch as (and therefore never
//! after) the hash index and latest pointer, so a reader can never find an
//! index entry pointing at a missing body.

use std::path::Path;

use rocksdb::{Options, WriteBatch, DB};

use crate::error::StorageError;
use crate::types::Block;

use super::{LedgerStore, TxLocation};

const LATEST_KEY: &str = "meta:latest";

/// Configuration for [`RocksDbLedger`].
#[derive(Clone, Debug)]
pub struct RocksDbLedgerConfig {
    /// Filesystem path of the `ledger/` database directory.
    pub path: String,
    /// Whether to create the database if it does not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbLedgerConfig {
    fn default() -> Self {
        Self {
            path: "data/ledger".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`LedgerStore`].
pub struct RocksDbLedger {
    db: DB,
}

impl RocksDbLedger {
    /// Opens (or creates) the ledger database at the configured path.
    pub fn open(cfg: &RocksDbLedgerConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);

        let db = DB::open(&opts, Path::new(&cfg.path))?;
        Ok(Self { db })
    }

    fn decode_number(raw: &[u8], what: &str) -> Result<u64, StorageError> {
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StorageError::Corrupted(format!("{what} record")))
    }

    fn decode_block(raw: &[u8]) -> Result<Block, StorageError> {
        serde_json::from_slice(raw)
            .map_err(|e| StorageError::Corrupted(format!("block body: {e}")))
    }
}

impl LedgerStore for RocksDbLedger {
    fn put_block(&mut self, block: &Block) -> Result<String, StorageError> {
        let hash = block
            .stored_hash()
            .map_err(|e| StorageError::Codec(e.to_string()))?;
        let number = block.header.number;
        let body = serde_json::to_vec(block)?;

        let latest = self
            .latest_block_number()?
            .map_or(number, |latest| latest.max(number));

        let mut batch = WriteBatch::default();
        batch.put(format!("block:{number}"), &body);
        batch.put(format!("hash:{hash}"), number.to_string().as_bytes());
        batch.put(LATEST_KEY, latest.to_string().as_bytes());
        self.db.write(batch)?;

        Ok(hash)
    }

    fn get_block(&self, number: u64) -> Result<Option<Block>, StorageError> {
        match self.db.get(format!("block:{number}"))? {
            None => Ok(None),
            Some(raw) => Self::decode_block(&raw).map(Some),
        }
    }

    fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>, StorageError> {
        match self.db.get(format!("hash:{hash}"))? {
            None => Ok(None),
            Some(raw) => {
                let number = Self::decode_number(&raw, "hash index")?;
                self.get_block(number)
            }
        }
    }

    fn latest_block_number(&self) -> Result<Option<u64>, StorageError> {
        match self.db.get(LATEST_KEY)? {
            None => Ok(None),
            Some(raw) => Self::decode_number(&raw, "latest pointer").map(Some),
        }
    }

    fn put_tx_index(
        &mut self,
        tx_id: &str,
        block_num: u64,
        tx_num: u64,
    ) -> Result<(), StorageError> {
        let location = serde_json::to_vec(&TxLocation { block_num, tx_num })?;
        self.db.put(format!("tx:{tx_id}"), location)?;
        Ok(())
    }

    fn get_tx_location(&self, tx_id: &str) -> Result<Option<TxLocation>, StorageError> {
        match self.db.get(format!("tx:{tx_id}"))? {
            None => Ok(None),
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupted(format!("tx index: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::empty_block;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RocksDbLedger) {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbLedgerConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        let ledger = RocksDbLedger::open(&cfg).expect("open RocksDB");
        (tmp, ledger)
    }

    #[test]
    fn block_roundtrip_and_indexes() {
        let (_tmp, mut ledger) = open_temp();

        let block = empty_block(0, "0");
        let hash = ledger.put_block(&block).unwrap();

        assert_eq!(ledger.latest_block_number().unwrap(), Some(0));
        let by_number = ledger.get_block(0).unwrap().unwrap();
        assert_eq!(by_number.header.previous_hash, "0");
        let by_hash = ledger.get_block_by_hash(&hash).unwrap().unwrap();
        assert_eq!(by_hash.header.number, 0);
    }

    #[test]
    fn reopen_preserves_chain() {
        let tmp = TempDir::new().unwrap();
        let cfg = RocksDbLedgerConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };

        let hash = {
            let mut ledger = RocksDbLedger::open(&cfg).unwrap();
            let h0 = ledger.put_block(&empty_block(0, "0")).unwrap();
            ledger.put_block(&empty_block(1, &h0)).unwrap();
            ledger.put_tx_index("tx-1", 1, 0).unwrap();
            h0
        };

        let ledger = RocksDbLedger::open(&cfg).unwrap();
        assert_eq!(ledger.latest_block_number().unwrap(), Some(1));
        assert_eq!(
            ledger.get_block(1).unwrap().unwrap().header.previous_hash,
            hash
        );
        assert_eq!(
            ledger.get_tx_location("tx-1").unwrap(),
            Some(TxLocation {
                block_num: 1,
                tx_num: 0
            })
        );
    }
}
