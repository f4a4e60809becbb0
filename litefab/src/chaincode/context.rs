//! Per-transaction execution context.
//!
//! The context is the only window chaincode has onto the world state. It
//! records every read (with the version observed at read time) and every
//! write, producing the [`RwSet`] the endorsement and commit machinery
//! runs on. Simulation never mutates the underlying store.

use crate::error::StorageError;
use crate::state::WorldState;
use crate::types::{ReadEntry, RwSet, WriteEntry};

/// Execution context handed to chaincode for one simulation.
pub struct ExecutionContext<'a> {
    state: &'a dyn WorldState,
    creator_id: &'a str,
    creator_org_id: &'a str,
    reads: Vec<ReadEntry>,
    writes: Vec<WriteEntry>,
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context over a world-state snapshot for one transaction.
    pub fn new(state: &'a dyn WorldState, creator_id: &'a str, creator_org_id: &'a str) -> Self {
        Self {
            state,
            creator_id,
            creator_org_id,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Identity of the transaction creator.
    pub fn creator_id(&self) -> &str {
        self.creator_id
    }

    /// Organization of the transaction creator.
    pub fn creator_org_id(&self) -> &str {
        self.creator_org_id
    }

    /// Reads `key`, recording the committed version first.
    ///
    /// A read after an earlier `put_state`/`del_state` of the same key in
    /// this transaction returns the pending value (read-your-own-writes),
    /// but the recorded read still carries the committed version; the
    /// version is what MVCC validation compares at commit time.
    pub fn get_state(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let version = self.state.get_version(key)?;
        self.reads.push(ReadEntry {
            key: key.to_string(),
            version,
        });

        if let Some(write) = self.writes.iter().rev().find(|w| w.key == key) {
            return Ok(write.value.clone());
        }
        self.state.get(key)
    }

    /// Records a pending write of `value` to `key`.
    pub fn put_state(&mut self, key: &str, value: &str) {
        self.writes.push(WriteEntry {
            key: key.to_string(),
            value: Some(value.to_string()),
        });
    }

    /// Records a pending delete of `key`.
    pub fn del_state(&mut self, key: &str) {
        self.writes.push(WriteEntry {
            key: key.to_string(),
            value: None,
        });
    }

    /// Consumes the context, yielding the collected read/write sets.
    pub fn into_rw_set(self) -> RwSet {
        RwSet {
            reads: self.reads,
            writes: self.writes,
        }
    }
}
