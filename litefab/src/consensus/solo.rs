//! Solo consensus: single-orderer batching.
//!
//! Every submission lands in one pending queue. A batch is cut as soon as
//! it reaches `block_size` transactions, or when the block timeout fires,
//! whichever comes first. The timer itself is owned by the caller (an
//! async runtime concern); this module only tracks whether one should be
//! armed, so the batching logic stays synchronous and testable.

use std::time::Duration;

use crate::types::{Block, TransactionEnvelope};

use super::{Consensus, ConsensusError, SubmitOutcome};

/// Default number of transactions that forces a cut.
pub const DEFAULT_BLOCK_SIZE: usize = 10;

/// Default wait before a partial batch is cut anyway.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Single-node consensus module.
pub struct SoloConsensus {
    block_size: usize,
    block_timeout: Duration,
    pending: Vec<TransactionEnvelope>,
    timer_armed: bool,
}

impl SoloConsensus {
    pub fn new(block_size: usize, block_timeout: Duration) -> Self {
        Self {
            block_size: block_size.max(1),
            block_timeout,
            pending: Vec::new(),
            timer_armed: false,
        }
    }

    /// Number of transactions currently waiting.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for SoloConsensus {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_TIMEOUT)
    }
}

impl Consensus for SoloConsensus {
    fn submit_tx(&mut self, env: TransactionEnvelope) -> Result<SubmitOutcome, ConsensusError> {
        self.pending.push(env);

        if self.pending.len() >= self.block_size {
            // Size cut: the batch leaves now and the timer (if armed)
            // must be cancelled by the caller.
            self.timer_armed = false;
            return Ok(SubmitOutcome::Cut(std::mem::take(&mut self.pending)));
        }

        let arm_timer = !self.timer_armed;
        self.timer_armed = true;
        Ok(SubmitOutcome::Queued { arm_timer })
    }

    fn cut(&mut self) -> Vec<TransactionEnvelope> {
        self.timer_armed = false;
        std::mem::take(&mut self.pending)
    }

    fn on_block_committed(&mut self, block: &Block) {
        tracing::debug!(
            block = block.header.number,
            txs = block.transactions.len(),
            "solo observed sealed block"
        );
    }

    fn block_timeout(&self) -> Duration {
        self.block_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::TxPayload;
    use crate::types::RwSet;

    fn envelope(tx_id: &str) -> TransactionEnvelope {
        TransactionEnvelope {
            tx_id: tx_id.into(),
            creator_id: "org1-client".into(),
            creator_org_id: "Org1".into(),
            creator_pub_key: "PEM".into(),
            payload: TxPayload::invoke("basic", "mint", vec![]),
            rw_set: RwSet::default(),
            result: None,
            endorsements: vec![],
            client_signature: "sig".into(),
        }
    }

    #[test]
    fn first_submission_arms_the_timer_once() {
        let mut solo = SoloConsensus::new(10, DEFAULT_BLOCK_TIMEOUT);

        match solo.submit_tx(envelope("a")).unwrap() {
            SubmitOutcome::Queued { arm_timer } => assert!(arm_timer),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match solo.submit_tx(envelope("b")).unwrap() {
            SubmitOutcome::Queued { arm_timer } => assert!(!arm_timer),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn reaching_block_size_cuts_immediately() {
        let mut solo = SoloConsensus::new(3, DEFAULT_BLOCK_TIMEOUT);
        solo.submit_tx(envelope("a")).unwrap();
        solo.submit_tx(envelope("b")).unwrap();

        match solo.submit_tx(envelope("c")).unwrap() {
            SubmitOutcome::Cut(batch) => {
                let ids: Vec<_> = batch.iter().map(|t| t.tx_id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(solo.pending_len(), 0);

        // The next submission starts a fresh batch and re-arms the timer.
        match solo.submit_tx(envelope("d")).unwrap() {
            SubmitOutcome::Queued { arm_timer } => assert!(arm_timer),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn timeout_cut_drains_whatever_is_pending() {
        let mut solo = SoloConsensus::new(10, DEFAULT_BLOCK_TIMEOUT);
        solo.submit_tx(envelope("a")).unwrap();

        let batch = solo.cut();
        assert_eq!(batch.len(), 1);

        // A timer that fires after a size cut finds nothing.
        assert!(solo.cut().is_empty());
    }

    #[test]
    fn preserves_submission_order() {
        let mut solo = SoloConsensus::new(100, DEFAULT_BLOCK_TIMEOUT);
        for id in ["x", "y", "z"] {
            solo.submit_tx(envelope(id)).unwrap();
        }
        let ids: Vec<_> = solo.cut().into_iter().map(|t| t.tx_id).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }
}
