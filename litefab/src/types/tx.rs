//! Transaction-level wire types and their signed subsets.
//!
//! Three signatures travel with a transaction on its way into a block:
//!
//! - the client's proposal signature, checked by endorsers,
//! - each endorser's signature over `(proposal, rwSet, result)`,
//! - the client's envelope signature, checked by orderer and committer.
//!
//! The exact byte string each one covers is produced by the `signed_payload`
//! helpers below, so producers and verifiers can never drift apart.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canonical;
use crate::error::LitefabError;
use crate::policy::EndorsementPolicy;

use super::RwSet;

/// Kind of application transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    Deploy,
    Invoke,
}

/// What a transaction asks the chaincode layer to do.
///
/// DEPLOY carries the endorsement policy that will govern the chaincode;
/// INVOKE carries the function to dispatch to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub chaincode_id: String,
    pub function_name: Option<String>,
    pub args: Vec<String>,
    pub endorsement_policy: Option<EndorsementPolicy>,
}

impl TxPayload {
    /// Payload for a DEPLOY transaction.
    pub fn deploy(
        chaincode_id: impl Into<String>,
        args: Vec<String>,
        policy: Option<EndorsementPolicy>,
    ) -> Self {
        Self {
            tx_type: TxType::Deploy,
            chaincode_id: chaincode_id.into(),
            function_name: None,
            args,
            endorsement_policy: policy,
        }
    }

    /// Payload for an INVOKE transaction.
    pub fn invoke(
        chaincode_id: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            tx_type: TxType::Invoke,
            chaincode_id: chaincode_id.into(),
            function_name: Some(function.into()),
            args,
            endorsement_policy: None,
        }
    }
}

/// A signed request for simulation, sent by a client to endorsing peers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub tx_id: String,
    pub creator_id: String,
    pub creator_org_id: String,
    pub creator_pub_key: String,
    pub payload: TxPayload,
    pub signature: String,
}

impl Proposal {
    /// The byte string the client signs and endorsers verify: every field
    /// except the signature itself.
    pub fn signed_payload(&self) -> Result<String, LitefabError> {
        canonical::value_to_canonical(&json!({
            "txId": self.tx_id,
            "creatorId": self.creator_id,
            "creatorOrgId": self.creator_org_id,
            "creatorPubKey": self.creator_pub_key,
            "payload": serde_json::to_value(&self.payload)?,
        }))
    }
}

/// One peer's signed attestation over a simulation outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endorsement {
    pub endorser_id: String,
    pub endorser_org_id: String,
    pub signature: String,
}

/// What an endorsing peer returns for a proposal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResponse {
    pub proposal: Proposal,
    pub rw_set: RwSet,
    pub result: Option<String>,
    pub endorsement: Endorsement,
}

/// The byte string each endorsement signature covers: the proposal identity
/// plus the simulation outcome it vouches for.
pub fn endorsement_signed_payload(
    tx_id: &str,
    payload: &TxPayload,
    rw_set: &RwSet,
    result: &Option<String>,
) -> Result<String, LitefabError> {
    canonical::value_to_canonical(&json!({
        "proposal": {
            "txId": tx_id,
            "payload": serde_json::to_value(payload)?,
        },
        "rwSet": serde_json::to_value(rw_set)?,
        "result": result,
    }))
}

/// A fully-assembled transaction, ready for ordering.
///
/// Immutable once the client signature is attached; the committer only ever
/// reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    pub tx_id: String,
    pub creator_id: String,
    pub creator_org_id: String,
    pub creator_pub_key: String,
    pub payload: TxPayload,
    pub rw_set: RwSet,
    pub result: Option<String>,
    pub endorsements: Vec<Endorsement>,
    pub client_signature: String,
}

impl TransactionEnvelope {
    /// The byte string the client signature covers: every envelope field
    /// except `clientSignature` itself.
    pub fn signed_payload(&self) -> Result<String, LitefabError> {
        canonical::value_to_canonical(&json!({
            "txId": self.tx_id,
            "creatorId": self.creator_id,
            "creatorOrgId": self.creator_org_id,
            "creatorPubKey": self.creator_pub_key,
            "payload": serde_json::to_value(&self.payload)?,
            "rwSet": serde_json::to_value(&self.rw_set)?,
            "result": self.result,
            "endorsements": serde_json::to_value(&self.endorsements)?,
        }))
    }
}
