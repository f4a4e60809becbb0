//! Core domain types shared across the runtime.
//!
//! This module defines the MVCC building blocks (versions, read/write sets)
//! and the per-transaction validation codes recorded at commit. Transaction
//! and block shapes live in the `tx` and `block` submodules. All wire types
//! serialize as camelCase JSON; signed payloads additionally go through
//! [`crate::canonical`].

use serde::{Deserialize, Serialize};

pub mod block;
pub mod tx;

pub use block::{Block, BlockHeader, BlockMetadata, ValidationInfo};
pub use tx::{
    Endorsement, Proposal, ProposalResponse, TransactionEnvelope, TxPayload, TxType,
};

/// Position of a committed transaction: the block it landed in and its
/// index within that block.
///
/// A key's stored version is the position of the transaction that last
/// wrote it. A read of a never-written key records no version at all,
/// and that absence is significant for MVCC validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub block_num: u64,
    pub tx_num: u64,
}

impl Version {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Self { block_num, tx_num }
    }
}

/// One recorded read: the key and the version observed at simulation time.
///
/// `version == None` means the key had never been written when it was read;
/// commit-time validation treats ∅-vs-present as a mismatch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEntry {
    pub key: String,
    pub version: Option<Version>,
}

/// One recorded write. `value == None` denotes a delete.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEntry {
    pub key: String,
    pub value: Option<String>,
}

/// Ordered read and write sets collected by one simulation.
///
/// Owned by the endorser's execution context while simulation runs;
/// immutable once returned. Any faithful simulation of the same payload on
/// the same world-state snapshot produces the same `RwSet`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RwSet {
    pub reads: Vec<ReadEntry>,
    pub writes: Vec<WriteEntry>,
}

/// Per-transaction outcome assigned by the committer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    Valid,
    EndorsementPolicyFailure,
    MvccReadConflict,
    BadPayload,
    MspValidationFailed,
}

impl ValidationCode {
    /// Wire / metrics-label spelling of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Valid => "VALID",
            ValidationCode::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            ValidationCode::MvccReadConflict => "MVCC_READ_CONFLICT",
            ValidationCode::BadPayload => "BAD_PAYLOAD",
            ValidationCode::MspValidationFailed => "MSP_VALIDATION_FAILED",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_serializes_camel_case() {
        let v = Version::new(3, 1);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"blockNum":3,"txNum":1}"#);
    }

    #[test]
    fn read_entry_distinguishes_absent_version() {
        let none = ReadEntry {
            key: "k".into(),
            version: None,
        };
        let some = ReadEntry {
            key: "k".into(),
            version: Some(Version::new(0, 0)),
        };
        assert_ne!(none, some);
        assert!(serde_json::to_string(&none).unwrap().contains("null"));
    }

    #[test]
    fn validation_code_wire_spelling() {
        let json = serde_json::to_string(&ValidationCode::MvccReadConflict).unwrap();
        assert_eq!(json, r#""MVCC_READ_CONFLICT""#);
        let back: ValidationCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ValidationCode::MvccReadConflict);
        assert_eq!(back.as_str(), "MVCC_READ_CONFLICT");
    }
}
