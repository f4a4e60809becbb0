//! Pluggable consensus modules.
//!
//! A consensus module decides how submitted envelopes become batches. It is
//! modeled as a small capability set (accept a transaction, cut on
//! timeout, observe committed blocks) behind the [`Consensus`] trait, so
//! the orderer composes with any variant (Solo, Raft, …) instead of
//! inheriting from one.
//!
//! Block *sealing* (numbering, hashing, signing, persistence) is not a
//! consensus concern; it lives in [`crate::orderer::OrdererService`], which
//! consumes the batches produced here.

use thiserror::Error;

use crate::types::{Block, TransactionEnvelope};

pub mod raft;
pub mod solo;

pub use raft::{RaftConsensus, RaftRole};
pub use solo::SoloConsensus;

/// Why a consensus module refused a submission.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// This node cannot accept transactions in its current role.
    #[error("not the leader")]
    NotLeader {
        /// Best guess at who is, for the client to retry against.
        hint: Option<String>,
    },
}

/// What happened to a submitted transaction.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The transaction was queued. `arm_timer` is `true` when this
    /// submission started a new batch and the caller should arm the
    /// block-timeout timer.
    Queued { arm_timer: bool },

    /// The size threshold was reached: this batch must be sealed now, and
    /// any armed timer cancelled.
    Cut(Vec<TransactionEnvelope>),
}

/// Capability set of a consensus module.
pub trait Consensus: Send {
    /// Accepts one verified envelope into the pending batch.
    fn submit_tx(&mut self, env: TransactionEnvelope) -> Result<SubmitOutcome, ConsensusError>;

    /// Drains the pending batch because the block timeout fired. May be
    /// empty if a size cut raced the timer.
    fn cut(&mut self) -> Vec<TransactionEnvelope>;

    /// Observes a block that was sealed and persisted.
    fn on_block_committed(&mut self, block: &Block);

    /// How long the caller should wait before forcing a cut.
    fn block_timeout(&self) -> std::time::Duration;
}
