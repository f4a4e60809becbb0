//! Orderer service: envelope intake and block sealing.
//!
//! The orderer verifies client signatures, feeds envelopes to its
//! consensus module, and turns the batches that come back into signed,
//! chained, persisted blocks. Broadcasting the sealed block to peers is a
//! transport concern handled by the binary.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::consensus::{Consensus, SubmitOutcome};
use crate::crypto::SigningIdentity;
use crate::error::{LitefabError, StorageError};
use crate::ledger::LedgerStore;
use crate::msp::{Msp, Role};
use crate::types::{Block, BlockHeader, BlockMetadata, TransactionEnvelope};

/// What the orderer did with a submitted envelope.
#[derive(Debug)]
pub enum SubmitDisposition {
    /// Queued into the pending batch; `arm_timer` asks the caller to start
    /// the block-timeout timer.
    Queued { arm_timer: bool },

    /// The batch was cut, sealed, and persisted; the caller should cancel
    /// any armed timer and broadcast the block.
    Sealed(Block),
}

/// The ordering half of a node.
pub struct OrdererService<L: LedgerStore> {
    id: String,
    key: SigningIdentity,
    msp: Arc<Msp>,
    ledger: L,
    consensus: Box<dyn Consensus>,
}

impl<L: LedgerStore> OrdererService<L> {
    pub fn new(
        id: impl Into<String>,
        key: SigningIdentity,
        msp: Arc<Msp>,
        ledger: L,
        consensus: Box<dyn Consensus>,
    ) -> Self {
        Self {
            id: id.into(),
            key,
            msp,
            ledger,
            consensus,
        }
    }

    /// Identity under which blocks are signed.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The block timeout the caller should use when arming cut timers.
    pub fn block_timeout(&self) -> std::time::Duration {
        self.consensus.block_timeout()
    }

    /// Read access to the local ledger, for tests and tooling.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Accepts one envelope: verify the client signature, then hand it to
    /// consensus. Seals immediately when the batch reaches the size
    /// threshold.
    pub fn submit(
        &mut self,
        envelope: TransactionEnvelope,
    ) -> Result<SubmitDisposition, LitefabError> {
        let signed = envelope.signed_payload()?;
        let outcome = self.msp.verify_signature(
            &signed,
            &envelope.client_signature,
            &envelope.creator_id,
            Some(Role::Client),
        );
        if !outcome.valid {
            return Err(LitefabError::SignatureInvalid(
                outcome.error.unwrap_or_else(|| "envelope signature".into()),
            ));
        }

        match self
            .consensus
            .submit_tx(envelope)
            .map_err(|e| LitefabError::Consensus(e.to_string()))?
        {
            SubmitOutcome::Queued { arm_timer } => Ok(SubmitDisposition::Queued { arm_timer }),
            SubmitOutcome::Cut(batch) => Ok(SubmitDisposition::Sealed(self.seal(batch)?)),
        }
    }

    /// Cuts whatever is pending because the block timeout fired. Returns
    /// `None` when a size cut already drained the batch.
    pub fn cut_on_timeout(&mut self) -> Result<Option<Block>, LitefabError> {
        let batch = self.consensus.cut();
        if batch.is_empty() {
            return Ok(None);
        }
        self.seal(batch).map(Some)
    }

    /// Builds, signs, and persists a block from a cut batch.
    ///
    /// The block number is the ledger's latest plus one, and
    /// `previousHash` is the stored hash of that latest block, recomputed
    /// from the chain rather than assumed.
    fn seal(&mut self, batch: Vec<TransactionEnvelope>) -> Result<Block, LitefabError> {
        let (number, previous_hash) = match self.ledger.latest_block_number()? {
            None => (0, "0".to_string()),
            Some(latest) => {
                let prev = self.ledger.get_block(latest)?.ok_or_else(|| {
                    StorageError::Corrupted(format!("latest block {latest} has no body"))
                })?;
                (latest + 1, prev.stored_hash()?)
            }
        };

        let data_hash = Block::compute_data_hash(&batch)?;
        let mut block = Block {
            header: BlockHeader {
                number,
                previous_hash,
                data_hash,
            },
            transactions: batch,
            metadata: BlockMetadata {
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                orderer_id: self.id.clone(),
                orderer_signature: String::new(),
                validation_info: vec![],
            },
        };
        block.metadata.orderer_signature = self.key.sign_base64(&block.signed_payload()?);

        self.ledger.put_block(&block)?;
        self.consensus.on_block_committed(&block);

        tracing::info!(
            block = block.header.number,
            txs = block.transactions.len(),
            "sealed block"
        );
        Ok(block)
    }

    /// Stores a block sealed by another orderer, after verifying its
    /// orderer signature against the MSP.
    pub fn store_remote(&mut self, block: Block) -> Result<String, LitefabError> {
        let signed = block.signed_payload()?;
        let outcome = self.msp.verify_signature(
            &signed,
            &block.metadata.orderer_signature,
            &block.metadata.orderer_id,
            Some(Role::Orderer),
        );
        if !outcome.valid {
            return Err(LitefabError::SignatureInvalid(
                outcome.error.unwrap_or_else(|| "orderer signature".into()),
            ));
        }
        Ok(self.ledger.put_block(&block)?)
    }
}
