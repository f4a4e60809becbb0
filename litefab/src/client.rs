//! Client-side transaction assembly and submission.
//!
//! The client drives the execute-order half of the pipeline: it signs a
//! proposal, collects endorsements from the configured peers, folds them
//! into a signed envelope, and hands the envelope to an orderer. Peer and
//! orderer calls fail over to the next configured address; only when every
//! address fails does the error reach the operator.

use serde_json::json;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::crypto::SigningIdentity;
use crate::error::LitefabError;
use crate::policy::EndorsementPolicy;
use crate::types::tx::{Proposal, ProposalResponse, TransactionEnvelope, TxPayload};

/// A signing client for one MSP identity.
pub struct Client {
    id: String,
    org_id: String,
    key: SigningIdentity,
    public_key_pem: String,
    peers: Vec<String>,
    orderers: Vec<String>,
    http: reqwest::Client,
}

impl Client {
    /// Builds a client from its config, loading the private key from disk.
    pub fn from_config(cfg: &ClientConfig) -> Result<Self, LitefabError> {
        let key = SigningIdentity::from_pem_file(&cfg.private_key_path)?;
        let public_key_pem = key.public_key_pem()?;
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| LitefabError::Transport(format!("building HTTP client: {e}")))?;

        Ok(Self {
            id: cfg.client_id.clone(),
            org_id: cfg.org_id.clone(),
            key,
            public_key_pem,
            peers: cfg.peers.clone(),
            orderers: cfg.orderers.clone(),
            http,
        })
    }

    /// Test/embedding constructor that skips the HTTP configuration.
    pub fn new_in_process(
        id: impl Into<String>,
        org_id: impl Into<String>,
        key: SigningIdentity,
    ) -> Result<Self, LitefabError> {
        let public_key_pem = key.public_key_pem()?;
        Ok(Self {
            id: id.into(),
            org_id: org_id.into(),
            key,
            public_key_pem,
            peers: Vec::new(),
            orderers: Vec::new(),
            http: reqwest::Client::new(),
        })
    }

    /// Creates and signs a proposal for `payload` with a fresh tx id.
    pub fn new_proposal(&self, payload: TxPayload) -> Result<Proposal, LitefabError> {
        let mut proposal = Proposal {
            tx_id: Uuid::new_v4().to_string(),
            creator_id: self.id.clone(),
            creator_org_id: self.org_id.clone(),
            creator_pub_key: self.public_key_pem.clone(),
            payload,
            signature: String::new(),
        };
        proposal.signature = self.key.sign_base64(&proposal.signed_payload()?);
        Ok(proposal)
    }

    /// Folds endorsement responses into a signed envelope.
    ///
    /// All honest endorsers return the same read/write sets and result for
    /// the same proposal, so the simulation outcome is taken from the
    /// first response and only the endorsements accumulate.
    pub fn assemble_envelope(
        &self,
        proposal: &Proposal,
        responses: &[ProposalResponse],
    ) -> Result<TransactionEnvelope, LitefabError> {
        let first = responses.first().ok_or_else(|| {
            LitefabError::BadRequest("cannot build an envelope without endorsements".into())
        })?;

        let mut envelope = TransactionEnvelope {
            tx_id: proposal.tx_id.clone(),
            creator_id: self.id.clone(),
            creator_org_id: self.org_id.clone(),
            creator_pub_key: self.public_key_pem.clone(),
            payload: proposal.payload.clone(),
            rw_set: first.rw_set.clone(),
            result: first.result.clone(),
            endorsements: responses.iter().map(|r| r.endorsement.clone()).collect(),
            client_signature: String::new(),
        };
        envelope.client_signature = self.key.sign_base64(&envelope.signed_payload()?);
        Ok(envelope)
    }

    /// Sends the proposal to every configured peer and returns the
    /// responses that came back. Unreachable or refusing peers are logged
    /// and skipped; zero responses is an error.
    pub async fn gather_endorsements(
        &self,
        proposal: &Proposal,
    ) -> Result<Vec<ProposalResponse>, LitefabError> {
        let mut responses = Vec::new();
        for peer in &self.peers {
            let url = format!("{}/proposal", peer.trim_end_matches('/'));
            match self.http.post(&url).json(proposal).send().await {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<ProposalResponse>().await {
                        Ok(pr) => responses.push(pr),
                        Err(e) => {
                            tracing::warn!(%peer, error = %e, "malformed proposal response")
                        }
                    }
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(%peer, %status, %body, "peer refused proposal");
                }
                Err(e) => tracing::warn!(%peer, error = %e, "peer unreachable"),
            }
        }

        if responses.is_empty() {
            return Err(LitefabError::Transport(format!(
                "no endorsements: all {} peer(s) failed",
                self.peers.len()
            )));
        }
        Ok(responses)
    }

    /// Submits the envelope to the orderers, trying each address in turn.
    pub async fn submit_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<serde_json::Value, LitefabError> {
        for orderer in &self.orderers {
            let url = format!("{}/submit", orderer.trim_end_matches('/'));
            match self.http.post(&url).json(envelope).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.map_err(|e| {
                        LitefabError::Transport(format!("malformed orderer response: {e}"))
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(%orderer, %status, %body, "orderer refused envelope");
                }
                Err(e) => tracing::warn!(%orderer, error = %e, "orderer unreachable"),
            }
        }
        Err(LitefabError::Transport(format!(
            "submission failed on all {} orderer(s)",
            self.orderers.len()
        )))
    }

    /// Runs the full deploy flow for a chaincode.
    pub async fn deploy(
        &self,
        chaincode_id: &str,
        policy: EndorsementPolicy,
        init_args: Vec<String>,
    ) -> Result<String, LitefabError> {
        let payload = TxPayload::deploy(chaincode_id, init_args, Some(policy));
        self.execute(payload).await
    }

    /// Runs the full invoke flow for a chaincode function.
    pub async fn invoke(
        &self,
        chaincode_id: &str,
        function: &str,
        args: Vec<String>,
    ) -> Result<String, LitefabError> {
        let payload = TxPayload::invoke(chaincode_id, function, args);
        self.execute(payload).await
    }

    async fn execute(&self, payload: TxPayload) -> Result<String, LitefabError> {
        let proposal = self.new_proposal(payload)?;
        let responses = self.gather_endorsements(&proposal).await?;
        let envelope = self.assemble_envelope(&proposal, &responses)?;
        let ack = self.submit_envelope(&envelope).await?;
        tracing::info!(tx_id = %proposal.tx_id, orderer_ack = %ack, "transaction submitted");
        Ok(proposal.tx_id)
    }

    /// Reads a world-state key through the peers' query endpoint, failing
    /// over to the next peer on transport errors.
    pub async fn query(&self, key: &str) -> Result<Option<String>, LitefabError> {
        for peer in &self.peers {
            let url = format!("{}/query", peer.trim_end_matches('/'));
            match self
                .http
                .get(&url)
                .query(&[("key", key)])
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    let body: serde_json::Value = resp.json().await.map_err(|e| {
                        LitefabError::Transport(format!("malformed query response: {e}"))
                    })?;
                    return Ok(body
                        .get("value")
                        .and_then(|v| v.as_str())
                        .map(str::to_string));
                }
                Ok(resp) => {
                    let status = resp.status();
                    tracing::warn!(%peer, %status, "peer refused query");
                }
                Err(e) => tracing::warn!(%peer, error = %e, "peer unreachable"),
            }
        }
        Err(LitefabError::Transport(format!(
            "query failed on all {} peer(s)",
            self.peers.len()
        )))
    }

    /// The JSON body a `/query` endpoint returns for a value.
    pub fn query_response(value: Option<String>) -> serde_json::Value {
        json!({ "value": value })
    }
}
