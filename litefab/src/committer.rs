//! Commit-time validation pipeline.
//!
//! Transactions arrive in orderer-defined block order and are validated
//! one by one: client signature, endorsement policy, then MVCC read-set
//! checks against the *current* world state, which already includes the
//! writes of earlier valid transactions in the same block. An invalid
//! transaction is recorded with its validation code and skipped; it never
//! aborts the block. Only storage failures abort a commit.

use std::sync::Arc;

use crate::error::LitefabError;
use crate::ledger::LedgerStore;
use crate::msp::{Msp, Role};
use crate::policy::EndorsementPolicy;
use crate::state::{ChaincodeMetadata, WorldState};
use crate::types::tx::{endorsement_signed_payload, TransactionEnvelope, TxType};
use crate::types::{Block, ValidationCode, ValidationInfo};

/// Outcome of committing one block.
#[derive(Clone, Debug)]
pub struct CommitOutcome {
    pub block_number: u64,
    pub stored_hash: String,
    pub validation: Vec<ValidationInfo>,
}

impl CommitOutcome {
    /// Number of transactions that committed as VALID.
    pub fn valid_count(&self) -> usize {
        self.validation
            .iter()
            .filter(|v| v.code == ValidationCode::Valid)
            .count()
    }
}

/// The peer-side committer.
///
/// Holds only the MSP; the stores are passed per call so the caller
/// controls locking and store lifetimes.
pub struct Committer {
    msp: Arc<Msp>,
}

/// Transaction verdict before writes are applied.
enum Verdict {
    Apply { deploy_meta: Option<ChaincodeMetadata> },
    Reject { code: ValidationCode, message: String },
}

impl Committer {
    pub fn new(msp: Arc<Msp>) -> Self {
        Self { msp }
    }

    /// Validates and applies one block, then persists it with per-tx
    /// validation codes filled into the metadata.
    pub fn commit_block<S, L>(
        &self,
        state: &mut S,
        ledger: &mut L,
        mut block: Block,
    ) -> Result<CommitOutcome, LitefabError>
    where
        S: WorldState + ?Sized,
        L: LedgerStore + ?Sized,
    {
        let block_number = block.header.number;
        let mut validation = Vec::with_capacity(block.transactions.len());

        for (index, tx) in block.transactions.iter().enumerate() {
            let tx_num = index as u64;
            let verdict = self.validate_transaction(state, tx)?;

            let info = match verdict {
                Verdict::Apply { deploy_meta } => {
                    state.apply(&tx.rw_set, block_number, tx_num)?;
                    if let Some(meta) = deploy_meta {
                        state.put_chaincode_metadata(&meta)?;
                    }
                    ValidationInfo {
                        tx_id: tx.tx_id.clone(),
                        code: ValidationCode::Valid,
                        message: None,
                    }
                }
                Verdict::Reject { code, message } => {
                    tracing::warn!(
                        tx_id = %tx.tx_id,
                        block = block_number,
                        code = %code,
                        %message,
                        "transaction rejected at commit"
                    );
                    ValidationInfo {
                        tx_id: tx.tx_id.clone(),
                        code,
                        message: Some(message),
                    }
                }
            };

            ledger.put_tx_index(&tx.tx_id, block_number, tx_num)?;
            validation.push(info);
        }

        block.metadata.validation_info = validation.clone();
        let stored_hash = ledger.put_block(&block)?;

        let outcome = CommitOutcome {
            block_number,
            stored_hash,
            validation,
        };
        tracing::info!(
            block = block_number,
            txs = block.transactions.len(),
            valid = outcome.valid_count(),
            hash = %outcome.stored_hash,
            "committed block"
        );
        Ok(outcome)
    }

    /// Runs the per-transaction pipeline: signature, then endorsement
    /// policy, then MVCC. Returns a verdict; `Err` only on storage failure.
    fn validate_transaction<S>(
        &self,
        state: &S,
        tx: &TransactionEnvelope,
    ) -> Result<Verdict, LitefabError>
    where
        S: WorldState + ?Sized,
    {
        // 1. Client signature, enforced against the MSP-registered key.
        let signed = tx.signed_payload()?;
        let outcome =
            self.msp
                .verify_signature(&signed, &tx.client_signature, &tx.creator_id, Some(Role::Client));
        if !outcome.valid {
            return Ok(Verdict::Reject {
                code: ValidationCode::MspValidationFailed,
                message: outcome
                    .error
                    .unwrap_or_else(|| "client signature invalid".into()),
            });
        }

        // 2. Endorsement policy.
        let policy = match self.resolve_policy(state, tx)? {
            Ok(policy) => policy,
            Err(message) => {
                return Ok(Verdict::Reject {
                    code: ValidationCode::BadPayload,
                    message,
                })
            }
        };

        let endorsed_orgs = self.verified_endorser_orgs(tx)?;
        if !policy.is_satisfied_by(endorsed_orgs.iter().map(String::as_str)) {
            return Ok(Verdict::Reject {
                code: ValidationCode::EndorsementPolicyFailure,
                message: format!(
                    "policy {:?} over {:?} not satisfied by endorsing orgs {:?}",
                    policy.policy_type, policy.orgs, endorsed_orgs
                ),
            });
        }

        // 3. MVCC read-set validation against current state: transactions
        // later in the block see the writes of earlier valid ones.
        if !state.validate_read_set(&tx.rw_set.reads)? {
            return Ok(Verdict::Reject {
                code: ValidationCode::MvccReadConflict,
                message: "read-set version mismatch".into(),
            });
        }

        let deploy_meta = (tx.payload.tx_type == TxType::Deploy)
            .then(|| ChaincodeMetadata::deployed(tx.payload.chaincode_id.clone(), policy));
        Ok(Verdict::Apply { deploy_meta })
    }

    /// Resolves the endorsement policy governing a transaction.
    ///
    /// DEPLOY uses the payload's policy, defaulting to ANY of the creator's
    /// org. INVOKE loads the policy stored at deploy time; a missing entry
    /// is a `BAD_PAYLOAD` (reported through the inner `Err`).
    fn resolve_policy<S>(
        &self,
        state: &S,
        tx: &TransactionEnvelope,
    ) -> Result<Result<EndorsementPolicy, String>, LitefabError>
    where
        S: WorldState + ?Sized,
    {
        match tx.payload.tx_type {
            TxType::Deploy => Ok(Ok(tx
                .payload
                .endorsement_policy
                .clone()
                .unwrap_or_else(|| EndorsementPolicy::any_of_creator(&tx.creator_org_id)))),
            TxType::Invoke => match state.get_chaincode_metadata(&tx.payload.chaincode_id)? {
                Some(meta) => Ok(Ok(meta.endorsement_policy)),
                None => Ok(Err(format!(
                    "chaincode '{}' has no metadata entry",
                    tx.payload.chaincode_id
                ))),
            },
        }
    }

    /// Organizations whose endorsements verified (role PEER, signature over
    /// the canonical endorsement payload). Unverifiable endorsements are
    /// simply not counted.
    fn verified_endorser_orgs(
        &self,
        tx: &TransactionEnvelope,
    ) -> Result<Vec<String>, LitefabError> {
        let payload =
            endorsement_signed_payload(&tx.tx_id, &tx.payload, &tx.rw_set, &tx.result)?;

        let mut orgs = Vec::new();
        for endorsement in &tx.endorsements {
            let outcome = self.msp.verify_signature(
                &payload,
                &endorsement.signature,
                &endorsement.endorser_id,
                Some(Role::Peer),
            );
            if let Some(identity) = outcome.identity.filter(|_| outcome.valid) {
                // Trust the MSP-registered org, not the one on the wire.
                if !orgs.contains(&identity.org_id) {
                    orgs.push(identity.org_id);
                }
            }
        }
        Ok(orgs)
    }
}
