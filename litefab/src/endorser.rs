//! Endorsement of transaction proposals on a peer.
//!
//! An endorser simulates a proposal against its local world state and, if
//! the simulation succeeds, signs the `(proposal, rwSet, result)` triple.
//! It never writes to the store; the collected read/write sets travel back
//! to the client, and only the committer applies anything.

use crate::chaincode::{ChaincodeError, ChaincodeHost};
use crate::crypto::SigningIdentity;
use crate::error::LitefabError;
use crate::msp::{Msp, Role};
use crate::state::WorldState;
use crate::types::tx::{
    endorsement_signed_payload, Endorsement, Proposal, ProposalResponse, TxType,
};

/// A peer's endorsing identity.
pub struct Endorser {
    id: String,
    org_id: String,
    key: SigningIdentity,
}

impl Endorser {
    pub fn new(id: impl Into<String>, org_id: impl Into<String>, key: SigningIdentity) -> Self {
        Self {
            id: id.into(),
            org_id: org_id.into(),
            key,
        }
    }

    /// Identity under which endorsements are signed.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handles one proposal: verify, simulate, endorse.
    ///
    /// Error mapping for the HTTP layer: a bad proposal signature is
    /// `SignatureInvalid` (400), an unknown or undeployed chaincode is
    /// `NotFound` (404), and a chaincode failure is `ChaincodeExecution`.
    pub fn endorse(
        &self,
        msp: &Msp,
        host: &ChaincodeHost,
        state: &dyn WorldState,
        proposal: &Proposal,
    ) -> Result<ProposalResponse, LitefabError> {
        let signed = proposal.signed_payload()?;
        let outcome = msp.verify_signature(
            &signed,
            &proposal.signature,
            &proposal.creator_id,
            Some(Role::Client),
        );
        if !outcome.valid {
            return Err(LitefabError::SignatureInvalid(
                outcome.error.unwrap_or_else(|| "proposal signature".into()),
            ));
        }

        // INVOKE targets must have been deployed on this channel.
        if proposal.payload.tx_type == TxType::Invoke
            && state
                .get_chaincode_metadata(&proposal.payload.chaincode_id)?
                .is_none()
        {
            return Err(LitefabError::NotFound(format!(
                "chaincode '{}' is not deployed",
                proposal.payload.chaincode_id
            )));
        }

        let (rw_set, result) = host
            .execute_transaction(
                state,
                &proposal.payload,
                &proposal.creator_id,
                &proposal.creator_org_id,
            )
            .map_err(|e| match e {
                ChaincodeError::UnknownChaincode(id) => {
                    LitefabError::NotFound(format!("chaincode '{id}' is not registered"))
                }
                ChaincodeError::Storage(e) => LitefabError::Storage(e),
                other => LitefabError::ChaincodeExecution(other.to_string()),
            })?;

        let endorsed = endorsement_signed_payload(
            &proposal.tx_id,
            &proposal.payload,
            &rw_set,
            &result,
        )?;
        let signature = self.key.sign_base64(&endorsed);

        tracing::debug!(
            tx_id = %proposal.tx_id,
            chaincode = %proposal.payload.chaincode_id,
            reads = rw_set.reads.len(),
            writes = rw_set.writes.len(),
            "endorsed proposal"
        );

        Ok(ProposalResponse {
            proposal: proposal.clone(),
            rw_set,
            result,
            endorsement: Endorsement {
                endorser_id: self.id.clone(),
                endorser_org_id: self.org_id.clone(),
                signature,
            },
        })
    }
}
