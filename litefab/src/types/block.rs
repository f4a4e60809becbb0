//! Block types, hashing, and the orderer's signed subset.
//!
//! A block is immutable once the orderer signs it, with one deliberate
//! exception: the committer fills `metadata.validationInfo` before
//! persisting its copy. The orderer signature therefore covers the header,
//! the transactions, and only the `(timestamp, ordererId)` slice of the
//! metadata, so the two facts coexist without breaking verification.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canonical;
use crate::crypto;
use crate::error::LitefabError;

use super::{TransactionEnvelope, ValidationCode};

/// Consensus-level block header.
///
/// `number` increases strictly from 0; `previous_hash` is the stored hash
/// of the prior block (`"0"` for the genesis block).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,
    pub previous_hash: String,
    pub data_hash: String,
}

/// Outcome of commit-time validation for one transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationInfo {
    pub tx_id: String,
    pub code: ValidationCode,
    pub message: Option<String>,
}

/// Block metadata: ordering provenance plus commit-time validation codes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// ISO-8601 timestamp assigned when the block was cut.
    pub timestamp: String,
    pub orderer_id: String,
    /// Base64 signature over [`Block::signed_payload`]; empty until signed.
    pub orderer_signature: String,
    /// Filled in by the committer, never covered by the orderer signature.
    #[serde(default)]
    pub validation_info: Vec<ValidationInfo>,
}

/// Block = header + ordered transactions + metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<TransactionEnvelope>,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Digest over the canonical concatenation of the transactions, used as
    /// `header.dataHash`.
    pub fn compute_data_hash(transactions: &[TransactionEnvelope]) -> Result<String, LitefabError> {
        let mut buf = String::new();
        for tx in transactions {
            buf.push_str(&canonical::to_canonical(tx)?);
        }
        Ok(crypto::sha256_hex(buf.as_bytes()))
    }

    /// The byte string the orderer signs: header, transactions, and the
    /// metadata subset that exists at ordering time. `validationInfo` and
    /// the signature itself are excluded.
    pub fn signed_payload(&self) -> Result<String, LitefabError> {
        canonical::value_to_canonical(&json!({
            "header": serde_json::to_value(&self.header)?,
            "transactions": serde_json::to_value(&self.transactions)?,
            "metadata": {
                "timestamp": self.metadata.timestamp,
                "ordererId": self.metadata.orderer_id,
            },
        }))
    }

    /// Content hash under which the ledger indexes this block: the SHA-256
    /// of `canonical(header)`, each `canonical(tx)`, and
    /// `canonical(metadata)` concatenated in that order.
    ///
    /// Computed over the block as stored, so an orderer's copy (empty
    /// `validationInfo`) and a committer's copy hash independently.
    pub fn stored_hash(&self) -> Result<String, LitefabError> {
        let mut buf = canonical::to_canonical(&self.header)?;
        for tx in &self.transactions {
            buf.push_str(&canonical::to_canonical(tx)?);
        }
        buf.push_str(&canonical::to_canonical(&self.metadata)?);
        Ok(crypto::sha256_hex(buf.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::TxPayload;
    use crate::types::RwSet;

    fn dummy_envelope(tx_id: &str) -> TransactionEnvelope {
        TransactionEnvelope {
            tx_id: tx_id.into(),
            creator_id: "org1-client".into(),
            creator_org_id: "Org1".into(),
            creator_pub_key: "PEM".into(),
            payload: TxPayload::invoke("basic", "mint", vec!["5".into(), "A".into()]),
            rw_set: RwSet::default(),
            result: None,
            endorsements: vec![],
            client_signature: "sig".into(),
        }
    }

    fn dummy_block(number: u64) -> Block {
        let transactions = vec![dummy_envelope("tx-1")];
        let data_hash = Block::compute_data_hash(&transactions).unwrap();
        Block {
            header: BlockHeader {
                number,
                previous_hash: "0".into(),
                data_hash,
            },
            transactions,
            metadata: BlockMetadata {
                timestamp: "2026-01-01T00:00:00.000Z".into(),
                orderer_id: "orderer1".into(),
                orderer_signature: String::new(),
                validation_info: vec![],
            },
        }
    }

    #[test]
    fn data_hash_is_deterministic_and_order_sensitive() {
        let a = vec![dummy_envelope("tx-1"), dummy_envelope("tx-2")];
        let b = vec![dummy_envelope("tx-2"), dummy_envelope("tx-1")];

        assert_eq!(
            Block::compute_data_hash(&a).unwrap(),
            Block::compute_data_hash(&a).unwrap()
        );
        assert_ne!(
            Block::compute_data_hash(&a).unwrap(),
            Block::compute_data_hash(&b).unwrap()
        );
    }

    #[test]
    fn signed_payload_ignores_validation_info() {
        let mut block = dummy_block(0);
        let before = block.signed_payload().unwrap();

        block.metadata.validation_info.push(ValidationInfo {
            tx_id: "tx-1".into(),
            code: ValidationCode::Valid,
            message: None,
        });
        let after = block.signed_payload().unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn stored_hash_covers_validation_info() {
        let mut block = dummy_block(0);
        let before = block.stored_hash().unwrap();

        block.metadata.validation_info.push(ValidationInfo {
            tx_id: "tx-1".into(),
            code: ValidationCode::MvccReadConflict,
            message: Some("stale read".into()),
        });
        let after = block.stored_hash().unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn block_json_roundtrip() {
        let block = dummy_block(3);
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back.header, block.header);
        assert_eq!(back.transactions.len(), 1);
    }
}
